//! Pure planning of the desired command set for this container. Given the
//! immutable context and an instance distribution, `plan` deterministically
//! produces every argv the container must run; the reconciler relies on
//! byte-for-byte stable output to decide keep-vs-restart.

pub mod commands;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::ContainerContext;
use crate::packing::InstanceDistribution;

/// Desired or running commands, keyed by the stable per-container name.
pub type CommandSet = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("no ram budget configured for component `{0}`")]
    MissingRamBudget(String),

    #[error("ram budget for component `{component}` is {total_mb}MB, below the {min_mb}MB floor")]
    RamBudgetTooSmall {
        component: String,
        total_mb: u64,
        min_mb: u64,
    },

    #[error("shard {0} owns no entry in the packing plan")]
    ShardNotInPlan(u32),
}

pub fn plan(
    context: &ContainerContext,
    distribution: &InstanceDistribution,
) -> Result<CommandSet, PlannerError> {
    let mut commands = if context.is_master() {
        commands::master_commands(context, distribution)
    } else {
        commands::worker_commands(context, distribution)?
    };

    // every container runs its shell daemon
    commands.insert(
        commands::shell_id(context.shard),
        commands::shell_command(context),
    );
    Ok(commands)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Coordination, Package, PackageKind, Ports, TopologyIdentity};
    use crate::packing::parse_distribution;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const MIB: u64 = 1024 * 1024;

    pub(crate) fn test_context(shard: u32) -> ContainerContext {
        ContainerContext {
            shard,
            topology: TopologyIdentity {
                name: "word-count".to_string(),
                id: "word-count-1234".to_string(),
                definition_file: "word-count.defn".to_string(),
            },
            coordination: Coordination {
                node: "localhost:2181".to_string(),
                root: "/heron/states".to_string(),
            },
            ports: Ports {
                master: "6001".to_string(),
                controller: "6002".to_string(),
                stats: "6003".to_string(),
                metricsmgr: "6005".to_string(),
                shell: "6004".to_string(),
                scheduler: "6006".to_string(),
            },
            tmaster_binary: "bin/heron-tmaster".to_string(),
            stmgr_binary: "bin/heron-stmgr".to_string(),
            shell_binary: "bin/heron-shell".to_string(),
            java_home: "/usr/lib/jvm".to_string(),
            classpath: "word-count.jar".to_string(),
            instance_classpath: "instance/*".to_string(),
            metricsmgr_classpath: "metricsmgr/*".to_string(),
            internals_config_file: "heron_internals.yaml".to_string(),
            metrics_sinks_config_file: "metrics_sinks.yaml".to_string(),
            instance_jvm_opts: String::new(),
            component_jvm_opts: HashMap::new(),
            component_ram: HashMap::from([("S".to_string(), 300 * MIB)]),
            log_dir: PathBuf::from("log-files"),
            package: Package {
                kind: PackageKind::Jar,
                artifact_path: "topology.jar".to_string(),
            },
        }
    }

    fn names(commands: &CommandSet) -> Vec<&str> {
        commands.keys().map(String::as_str).collect()
    }

    #[test]
    fn worker_plans_stmgr_metricsmgr_shell_and_instances() {
        let context = test_context(1);
        let distribution = parse_distribution("1:S:10:0:S:11:1").unwrap();

        let commands = plan(&context, &distribution).unwrap();

        assert_eq!(
            vec![
                "container_1_S_10",
                "container_1_S_11",
                "heron-shell-1",
                "metricsmgr-1",
                "stmgr-1",
            ],
            names(&commands)
        );
    }

    #[test]
    fn master_plans_exactly_tmaster_metricsmgr_and_shell() {
        let context = test_context(0);
        let distribution = parse_distribution("1:S:10:0:S:11:1").unwrap();

        let commands = plan(&context, &distribution).unwrap();

        assert_eq!(
            vec!["heron-shell-0", "heron-tmaster", "metricsmgr-0"],
            names(&commands)
        );
    }

    #[test]
    fn planning_is_deterministic() {
        let context = test_context(1);
        let distribution = parse_distribution("1:S:10:0:S:11:1").unwrap();

        assert_eq!(
            plan(&context, &distribution).unwrap(),
            plan(&context, &distribution).unwrap()
        );
    }

    #[test]
    fn worker_without_plan_entry_is_an_error() {
        let context = test_context(3);
        let distribution = parse_distribution("1:S:10:0").unwrap();

        assert_matches!(
            plan(&context, &distribution),
            Err(PlannerError::ShardNotInPlan(3))
        );
    }

    #[test]
    fn undersized_ram_budget_is_an_error() {
        let mut context = test_context(1);
        context
            .component_ram
            .insert("S".to_string(), 150 * MIB);
        let distribution = parse_distribution("1:S:10:0").unwrap();

        assert_matches!(
            plan(&context, &distribution),
            Err(PlannerError::RamBudgetTooSmall { total_mb: 150, min_mb: 194, .. })
        );
    }

    #[test]
    fn missing_ram_budget_is_an_error() {
        let context = test_context(1);
        let distribution = parse_distribution("1:unknown:10:0").unwrap();

        assert_matches!(
            plan(&context, &distribution),
            Err(PlannerError::MissingRamBudget(component)) if component == "unknown"
        );
    }

    #[test]
    fn instance_heap_is_derived_from_the_ram_budget() {
        let context = test_context(1);
        let distribution = parse_distribution("1:S:10:0").unwrap();

        let commands = plan(&context, &distribution).unwrap();
        let instance = &commands["container_1_S_10"];

        // 300MB total - 64MB code cache - 128MB perm gen
        assert!(instance.contains(&"-Xmx108M".to_string()));
        assert!(instance.contains(&"-Xms108M".to_string()));
        assert!(instance.contains(&"-Xmn54M".to_string()));
    }

    #[test]
    fn component_jvm_opts_follow_the_defaults() {
        let mut context = test_context(1);
        context.instance_jvm_opts = "-XX:NewRatio=2".to_string();
        context
            .component_jvm_opts
            .insert("S".to_string(), "-XX:NewRatio=4".to_string());
        let distribution = parse_distribution("1:S:10:0").unwrap();

        let commands = plan(&context, &distribution).unwrap();
        let instance = &commands["container_1_S_10"];

        let default_at = instance.iter().position(|a| a == "-XX:NewRatio=2").unwrap();
        let component_at = instance.iter().position(|a| a == "-XX:NewRatio=4").unwrap();
        assert!(default_at < component_at, "component opts must win");
    }

    #[test]
    fn tmaster_argv_embeds_the_stmgr_membership() {
        let context = test_context(0);
        let one = parse_distribution("1:S:10:0").unwrap();
        let two = parse_distribution("1:S:10:0,2:S:11:0").unwrap();

        let tmaster_one = plan(&context, &one).unwrap()["heron-tmaster"].clone();
        let tmaster_two = plan(&context, &two).unwrap()["heron-tmaster"].clone();

        assert!(tmaster_one.contains(&"stmgr-1".to_string()));
        assert!(tmaster_two.contains(&"stmgr-1,stmgr-2".to_string()));
    }

    #[test]
    fn shell_command_points_at_the_log_dir() {
        let context = test_context(1);
        let distribution = parse_distribution("1:S:10:0").unwrap();

        let commands = plan(&context, &distribution).unwrap();
        assert_eq!(
            vec![
                "bin/heron-shell",
                "--port=6004",
                "--log_file_prefix=log-files/heron-shell.log",
            ],
            commands["heron-shell-1"]
        );
    }
}
