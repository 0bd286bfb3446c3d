use clap::Parser;

/// Launch contract of the executor. The scheduler that places a container
/// renders exactly these 31 values, in this order, after the program name;
/// the order is stable and must not change. Internally the executor only
/// ever touches the named fields.
#[derive(Parser, Debug, Clone)]
#[command(name = "heron-executor", version, about = "Per-container process supervisor")]
pub struct ExecutorArgs {
    /// Index of this container within the topology; 0 is the master.
    pub shard: u32,
    pub topology_name: String,
    pub topology_id: String,
    pub topology_defn_file: String,
    pub instance_distribution: String,
    pub zknode: String,
    pub zkroot: String,
    pub tmaster_binary: String,
    pub stmgr_binary: String,
    pub metricsmgr_classpath: String,
    /// Base64 payload, wrapped in double quotes with `=` escaped as `&equals;`.
    pub instance_jvm_opts: String,
    pub classpath: String,
    pub master_port: String,
    pub tmaster_controller_port: String,
    pub tmaster_stats_port: String,
    pub heron_internals_config_file: String,
    /// Encoded as `component:bytes,component:bytes,...`.
    pub component_rammap: String,
    /// Same escaping as `instance_jvm_opts`; decodes to a JSON object whose
    /// keys and values are themselves base64.
    pub component_jvm_opts: String,
    /// Either `tar` or `jar`.
    pub pkg_type: String,
    pub topology_jar_file: String,
    pub heron_java_home: String,
    pub shell_port: String,
    pub heron_shell_binary: String,
    pub metricsmgr_port: String,
    pub cluster: String,
    pub role: String,
    pub environ: String,
    pub instance_classpath: String,
    pub metrics_sinks_config_file: String,
    pub scheduler_classpath: String,
    pub scheduler_port: String,
}
