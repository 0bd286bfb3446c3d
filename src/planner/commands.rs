//! Argv templates for every kind of child the executor supervises.

use tracing::debug;

use crate::config::ContainerContext;
use crate::packing::{InstanceDistribution, InstanceSlot};

use super::{CommandSet, PlannerError};

pub const TMASTER_NAME: &str = "heron-tmaster";

const METRICSMGR_MAIN_CLASS: &str = "com.twitter.heron.metricsmgr.MetricsManager";
const INSTANCE_MAIN_CLASS: &str = "com.twitter.heron.instance.HeronInstance";

const CODE_CACHE_SIZE_MB: u64 = 64;
const PERM_GEN_SIZE_MB: u64 = 128;
// below this total the heap would not even fit a young generation
const MIN_TOTAL_JVM_MB: u64 = CODE_CACHE_SIZE_MB + PERM_GEN_SIZE_MB + 2;

pub fn stmgr_id(shard: u32) -> String {
    format!("stmgr-{}", shard)
}

pub fn metricsmgr_id(shard: u32) -> String {
    format!("metricsmgr-{}", shard)
}

pub fn shell_id(shard: u32) -> String {
    format!("heron-shell-{}", shard)
}

pub fn instance_id(shard: u32, slot: &InstanceSlot) -> String {
    format!(
        "container_{}_{}_{}",
        shard, slot.component_name, slot.global_task_id
    )
}

/// Stream-manager ids of every worker container in the plan, in order.
fn stmgr_membership(distribution: &InstanceDistribution) -> Vec<String> {
    (1..=distribution.len() as u32).map(stmgr_id).collect()
}

pub(super) fn master_commands(
    context: &ContainerContext,
    distribution: &InstanceDistribution,
) -> CommandSet {
    let mut commands = CommandSet::new();
    commands.insert(
        TMASTER_NAME.to_string(),
        tmaster_command(context, &stmgr_membership(distribution)),
    );
    commands.insert(
        metricsmgr_id(0),
        metricsmgr_command(context, &metricsmgr_id(0)),
    );
    commands
}

pub(super) fn worker_commands(
    context: &ContainerContext,
    distribution: &InstanceDistribution,
) -> Result<CommandSet, PlannerError> {
    let slots = distribution
        .get(&context.shard)
        .ok_or(PlannerError::ShardNotInPlan(context.shard))?;

    let stmgr = stmgr_id(context.shard);
    let instance_ids: Vec<String> = slots
        .iter()
        .map(|slot| instance_id(context.shard, slot))
        .collect();

    let mut commands = CommandSet::new();
    commands.insert(stmgr.clone(), stmgr_command(context, &stmgr, &instance_ids));
    commands.insert(
        metricsmgr_id(context.shard),
        metricsmgr_command(context, &metricsmgr_id(context.shard)),
    );
    for (slot, id) in slots.iter().zip(&instance_ids) {
        commands.insert(id.clone(), instance_command(context, id, slot, &stmgr)?);
    }
    Ok(commands)
}

fn tmaster_command(context: &ContainerContext, stmgr_ids: &[String]) -> Vec<String> {
    vec![
        context.tmaster_binary.clone(),
        context.ports.master.clone(),
        context.ports.controller.clone(),
        context.ports.stats.clone(),
        context.topology.name.clone(),
        context.topology.id.clone(),
        context.coordination.node.clone(),
        context.coordination.root.clone(),
        stmgr_ids.join(","),
        context.internals_config_file.clone(),
        context.metrics_sinks_config_file.clone(),
        context.ports.metricsmgr.clone(),
    ]
}

fn stmgr_command(context: &ContainerContext, stmgr: &str, instance_ids: &[String]) -> Vec<String> {
    vec![
        context.stmgr_binary.clone(),
        context.topology.name.clone(),
        context.topology.id.clone(),
        context.topology.definition_file.clone(),
        context.coordination.node.clone(),
        context.coordination.root.clone(),
        stmgr.to_string(),
        instance_ids.join(","),
        context.ports.master.clone(),
        context.ports.metricsmgr.clone(),
        context.ports.shell.clone(),
        context.internals_config_file.clone(),
    ]
}

fn metricsmgr_command(context: &ContainerContext, id: &str) -> Vec<String> {
    let mut command = vec![
        java_binary(context),
        // the host default -Xmx can be huge, so pin it
        "-Xmx1024M".to_string(),
    ];
    command.extend(gc_diagnostic_flags());
    command.extend([
        "-XX:+PrintCommandLineFlags".to_string(),
        "-Xloggc:log-files/gc.metricsmgr.log".to_string(),
        "-Djava.net.preferIPv4Stack=true".to_string(),
        "-cp".to_string(),
        context.metricsmgr_classpath.clone(),
        METRICSMGR_MAIN_CLASS.to_string(),
        id.to_string(),
        context.ports.metricsmgr.clone(),
        context.topology.name.clone(),
        context.topology.id.clone(),
        context.internals_config_file.clone(),
        context.metrics_sinks_config_file.clone(),
    ]);
    command
}

fn instance_command(
    context: &ContainerContext,
    id: &str,
    slot: &InstanceSlot,
    stmgr: &str,
) -> Result<Vec<String>, PlannerError> {
    let ram_bytes = context
        .component_ram
        .get(&slot.component_name)
        .copied()
        .ok_or_else(|| PlannerError::MissingRamBudget(slot.component_name.clone()))?;

    let total_jvm_mb = ram_bytes / (1024 * 1024);
    if total_jvm_mb < MIN_TOTAL_JVM_MB {
        return Err(PlannerError::RamBudgetTooSmall {
            component: slot.component_name.clone(),
            total_mb: total_jvm_mb,
            min_mb: MIN_TOTAL_JVM_MB,
        });
    }
    let heap_mb = total_jvm_mb - CODE_CACHE_SIZE_MB - PERM_GEN_SIZE_MB;
    let young_mb = heap_mb / 2;
    debug!(
        component = %slot.component_name,
        ram_bytes, total_jvm_mb, heap_mb, young_mb, "sized instance jvm"
    );

    let mut command = vec![
        java_binary(context),
        format!("-Xmx{}M", heap_mb),
        format!("-Xms{}M", heap_mb),
        format!("-Xmn{}M", young_mb),
        format!("-XX:MaxPermSize={}M", PERM_GEN_SIZE_MB),
        format!("-XX:PermSize={}M", PERM_GEN_SIZE_MB),
        format!("-XX:ReservedCodeCacheSize={}M", CODE_CACHE_SIZE_MB),
        "-XX:+CMSScavengeBeforeRemark".to_string(),
        "-XX:TargetSurvivorRatio=90".to_string(),
    ];
    command.extend(gc_diagnostic_flags());
    command.extend([
        "-XX:ParallelGCThreads=4".to_string(),
        format!("-Xloggc:log-files/gc.{}.log", id),
    ]);
    command.extend(context.instance_jvm_opts.split_whitespace().map(String::from));
    if let Some(opts) = context.component_jvm_opts.get(&slot.component_name) {
        command.extend(opts.split_whitespace().map(String::from));
    }
    command.extend([
        "-Djava.net.preferIPv4Stack=true".to_string(),
        "-cp".to_string(),
        format!("{}:{}", context.instance_classpath, context.classpath),
        INSTANCE_MAIN_CLASS.to_string(),
        context.topology.name.clone(),
        context.topology.id.clone(),
        id.to_string(),
        slot.component_name.clone(),
        slot.global_task_id.clone(),
        slot.component_index.clone(),
        stmgr.to_string(),
        context.ports.master.clone(),
        context.ports.metricsmgr.clone(),
        context.internals_config_file.clone(),
    ]);
    Ok(command)
}

pub(super) fn shell_command(context: &ContainerContext) -> Vec<String> {
    vec![
        context.shell_binary.clone(),
        format!("--port={}", context.ports.shell),
        format!(
            "--log_file_prefix={}/heron-shell.log",
            context.log_dir.display()
        ),
    ]
}

fn java_binary(context: &ContainerContext) -> String {
    format!("{}/bin/java", context.java_home)
}

fn gc_diagnostic_flags() -> Vec<String> {
    [
        "-XX:+PrintCommandLineFlags",
        "-verbosegc",
        "-XX:+PrintGCDetails",
        "-XX:+PrintGCTimeStamps",
        "-XX:+PrintGCDateStamps",
        "-XX:+PrintGCCause",
        "-XX:+PrintPromotionFailure",
        "-XX:+PrintTenuringDistribution",
        "-XX:+PrintHeapAtGC",
        "-XX:+HeapDumpOnOutOfMemoryError",
        "-XX:+UseConcMarkSweepGC",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
