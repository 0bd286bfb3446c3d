use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cli::ExecutorArgs;

use super::{internals, opts, ConfigError};

/// Shard index of the master container.
pub const MASTER_SHARD: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Tar,
    Jar,
}

impl PackageKind {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "tar" => Ok(PackageKind::Tar),
            "jar" => Ok(PackageKind::Jar),
            other => Err(ConfigError::UnknownPackageType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub kind: PackageKind,
    pub artifact_path: String,
}

#[derive(Debug, Clone)]
pub struct TopologyIdentity {
    pub name: String,
    pub id: String,
    pub definition_file: String,
}

/// Connection coordinates of the external coordination store.
#[derive(Debug, Clone)]
pub struct Coordination {
    pub node: String,
    pub root: String,
}

/// Ports are opaque strings here; the children validate them.
#[derive(Debug, Clone)]
pub struct Ports {
    pub master: String,
    pub controller: String,
    pub stats: String,
    pub metricsmgr: String,
    pub shell: String,
    pub scheduler: String,
}

/// Immutable identity and configuration of this container, derived from the
/// launch arguments once at startup. Everything the planner needs lives
/// here so that planning stays a pure function.
#[derive(Debug)]
pub struct ContainerContext {
    pub shard: u32,
    pub topology: TopologyIdentity,
    pub coordination: Coordination,
    pub ports: Ports,
    pub tmaster_binary: String,
    pub stmgr_binary: String,
    pub shell_binary: String,
    pub java_home: String,
    pub classpath: String,
    pub instance_classpath: String,
    pub metricsmgr_classpath: String,
    pub internals_config_file: String,
    pub metrics_sinks_config_file: String,
    /// Default JVM options appended to every instance command.
    pub instance_jvm_opts: String,
    /// Per-component JVM options, appended after the defaults so later
    /// flags win.
    pub component_jvm_opts: HashMap<String, String>,
    /// RAM budget per component, in bytes.
    pub component_ram: HashMap<String, u64>,
    pub log_dir: PathBuf,
    pub package: Package,
}

impl ContainerContext {
    pub fn from_args(args: &ExecutorArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            shard: args.shard,
            topology: TopologyIdentity {
                name: args.topology_name.clone(),
                id: args.topology_id.clone(),
                definition_file: args.topology_defn_file.clone(),
            },
            coordination: Coordination {
                node: args.zknode.clone(),
                root: args.zkroot.clone(),
            },
            ports: Ports {
                master: args.master_port.clone(),
                controller: args.tmaster_controller_port.clone(),
                stats: args.tmaster_stats_port.clone(),
                metricsmgr: args.metricsmgr_port.clone(),
                shell: args.shell_port.clone(),
                scheduler: args.scheduler_port.clone(),
            },
            tmaster_binary: args.tmaster_binary.clone(),
            stmgr_binary: args.stmgr_binary.clone(),
            shell_binary: args.heron_shell_binary.clone(),
            java_home: args.heron_java_home.clone(),
            classpath: args.classpath.clone(),
            instance_classpath: args.instance_classpath.clone(),
            metricsmgr_classpath: args.metricsmgr_classpath.clone(),
            internals_config_file: args.heron_internals_config_file.clone(),
            metrics_sinks_config_file: args.metrics_sinks_config_file.clone(),
            instance_jvm_opts: opts::decode_escaped(&args.instance_jvm_opts)?,
            component_jvm_opts: opts::decode_component_opts(&args.component_jvm_opts)?,
            component_ram: parse_ram_map(&args.component_rammap)?,
            log_dir: internals::load_logging_dir(Path::new(&args.heron_internals_config_file))?,
            package: Package {
                kind: PackageKind::parse(&args.pkg_type)?,
                artifact_path: args.topology_jar_file.clone(),
            },
        })
    }

    pub fn is_master(&self) -> bool {
        self.shard == MASTER_SHARD
    }
}

fn parse_ram_map(encoded: &str) -> Result<HashMap<String, u64>, ConfigError> {
    encoded
        .split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (component, bytes) = pair
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedRamEntry(pair.to_string()))?;
            let bytes = bytes
                .parse()
                .map_err(|source| ConfigError::InvalidRamBytes {
                    component: component.to_string(),
                    source,
                })?;
            Ok((component.to_string(), bytes))
        })
        .collect()
}
