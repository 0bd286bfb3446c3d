//! Turns packing-plan deliveries into supervised process changes. Every
//! delivery runs the same pipeline: parse, compare against the installed
//! distribution, replan, reconcile, apply.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ContainerContext;
use crate::packing::{self, InstanceDistribution, PlanError};
use crate::planner::{self, PlannerError};
use crate::reconciler;
use crate::store::{PlanCallback, StateStore, StoreError};
use crate::supervisor::{Supervisor, SupervisorError};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("malformed packing plan update")]
    Plan(#[from] PlanError),

    #[error("planning failed for the updated packing plan")]
    Planner(#[from] PlannerError),

    #[error("supervision failed while applying the packing plan")]
    Supervisor(#[from] SupervisorError),
}

pub struct PlanWatcher {
    context: Arc<ContainerContext>,
    supervisor: Arc<Supervisor>,
    /// Installed distribution. The lock is held across the whole
    /// parse-compare-plan-apply sequence so that deliveries from
    /// different stores cannot interleave their kill/start batches.
    installed: Mutex<InstanceDistribution>,
}

impl PlanWatcher {
    pub fn new(context: Arc<ContainerContext>, supervisor: Arc<Supervisor>) -> Self {
        Self {
            context,
            supervisor,
            installed: Mutex::new(InstanceDistribution::new()),
        }
    }

    /// Callback for one packing-plan delivery. Idempotent under
    /// redelivery of an unchanged plan.
    pub fn on_packing_plan(&self, encoded: &str) -> Result<(), WatchError> {
        let mut installed = self.installed.lock().unwrap();

        let incoming = packing::parse_distribution(encoded)?;
        if *installed == incoming {
            info!(
                shard = self.context.shard,
                "instance distribution unchanged, not relaunching"
            );
            return Ok(());
        }

        info!(
            shard = self.context.shard,
            "instance distribution changed, relaunching"
        );
        let desired = planner::plan(&self.context, &incoming)?;
        let current = self.supervisor.current_commands();
        let changes = reconciler::reconcile(&current, &desired);
        info!(
            "current: {:?} kill: {:?} keep: {:?} start: {:?}",
            current.keys().collect::<Vec<_>>(),
            changes.kill.keys().collect::<Vec<_>>(),
            changes.keep.keys().collect::<Vec<_>>(),
            changes.start.keys().collect::<Vec<_>>(),
        );
        reconciler::apply(&self.supervisor, &changes)?;

        *installed = incoming;
        Ok(())
    }
}

/// Registers the watcher with every configured store. The first delivery
/// bootstraps the container's process set.
pub fn subscribe(
    watcher: Arc<PlanWatcher>,
    stores: &[Box<dyn StateStore>],
    topology: &str,
) -> Result<(), StoreError> {
    let callback: PlanCallback = Arc::new(move |encoded: &str| {
        match watcher.on_packing_plan(encoded) {
            Ok(()) => {}
            Err(WatchError::Plan(err)) => {
                warn!("dropping malformed packing plan update: {}", err)
            }
            Err(err) => {
                // a plan that cannot be planned or applied means the
                // contract with the controller is broken; hand the
                // container back to the scheduler
                error!("cannot apply packing plan: {}", err);
                crate::lifecycle::terminate_group();
                std::process::exit(1);
            }
        }
    });

    for store in stores {
        store.watch_packing_plan(topology, callback.clone())?;
        info!(store = store.name(), "registered packing plan watch");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::tests::test_context;
    use crate::supervisor::RestartLimits;
    use assert_matches::assert_matches;
    use serial_test::serial;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::mpsc;
    use std::time::Duration;

    fn write_script(path: &Path) {
        fs::write(path, "#!/bin/sh\nsleep 30\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Fixture whose planned commands are all runnable shell scripts.
    fn runnable_watcher(dir: &Path, shard: u32) -> (Arc<Supervisor>, PlanWatcher) {
        fs::create_dir_all(dir.join("bin")).unwrap();
        write_script(&dir.join("bin/java"));
        write_script(&dir.join("tmaster"));
        write_script(&dir.join("stmgr"));
        write_script(&dir.join("shell"));

        let mut context = test_context(shard);
        context.java_home = dir.display().to_string();
        context.tmaster_binary = dir.join("tmaster").display().to_string();
        context.stmgr_binary = dir.join("stmgr").display().to_string();
        context.shell_binary = dir.join("shell").display().to_string();

        let (tx, _rx) = mpsc::channel();
        let supervisor = Arc::new(
            Supervisor::new(
                RestartLimits {
                    max_runs: 1,
                    interval_between_runs: Duration::ZERO,
                },
                tx,
            )
            .with_workdir(dir),
        );
        let watcher = PlanWatcher::new(Arc::new(context), supervisor.clone());
        (supervisor, watcher)
    }

    fn pid_of(dir: &Path, name: &str) -> u32 {
        fs::read_to_string(dir.join(format!("{}.pid", name)))
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    #[serial]
    fn bootstraps_noops_and_restarts_the_tmaster() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, watcher) = runnable_watcher(dir.path(), 0);

        // bootstrap
        watcher.on_packing_plan("1:S:10:0").unwrap();
        let current = supervisor.current_commands();
        assert_eq!(
            vec!["heron-shell-0", "heron-tmaster", "metricsmgr-0"],
            current.keys().map(String::as_str).collect::<Vec<_>>()
        );
        let tmaster_pid = pid_of(dir.path(), "heron-tmaster");
        let metricsmgr_pid = pid_of(dir.path(), "metricsmgr-0");

        // redelivery of the same plan changes nothing
        watcher.on_packing_plan("1:S:10:0").unwrap();
        assert_eq!(tmaster_pid, pid_of(dir.path(), "heron-tmaster"));
        assert_eq!(metricsmgr_pid, pid_of(dir.path(), "metricsmgr-0"));

        // a changed distribution restarts the tmaster even though its
        // argv is identical, while the metrics manager is kept
        watcher.on_packing_plan("1:S:10:0:S:11:1").unwrap();
        assert_ne!(tmaster_pid, pid_of(dir.path(), "heron-tmaster"));
        assert_eq!(metricsmgr_pid, pid_of(dir.path(), "metricsmgr-0"));

        supervisor.kill(&supervisor.current_commands());
    }

    #[test]
    #[serial]
    fn a_malformed_update_is_dropped_without_touching_children() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, watcher) = runnable_watcher(dir.path(), 0);

        watcher.on_packing_plan("1:S:10:0").unwrap();
        let tmaster_pid = pid_of(dir.path(), "heron-tmaster");

        assert_matches!(
            watcher.on_packing_plan("1:S:10"),
            Err(WatchError::Plan(_))
        );
        assert_eq!(tmaster_pid, pid_of(dir.path(), "heron-tmaster"));

        // a later good update still lands
        watcher.on_packing_plan("1:S:10:0:S:11:1").unwrap();
        assert_ne!(tmaster_pid, pid_of(dir.path(), "heron-tmaster"));

        supervisor.kill(&supervisor.current_commands());
    }

    #[test]
    #[serial]
    fn a_planner_error_leaves_the_installed_distribution_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (supervisor, watcher) = runnable_watcher(dir.path(), 1);

        watcher.on_packing_plan("1:S:10:0").unwrap();
        assert_eq!(
            vec![
                "container_1_S_10",
                "heron-shell-1",
                "metricsmgr-1",
                "stmgr-1",
            ],
            supervisor
                .current_commands()
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
        );

        // no ram budget for this component, the update must be dropped
        assert_matches!(
            watcher.on_packing_plan("1:unknown:10:0"),
            Err(WatchError::Planner(_))
        );

        // the failed update did not install, so redelivering the
        // previous plan is still a no-op
        let stmgr_pid = pid_of(dir.path(), "stmgr-1");
        watcher.on_packing_plan("1:S:10:0").unwrap();
        assert_eq!(stmgr_pid, pid_of(dir.path(), "stmgr-1"));

        supervisor.kill(&supervisor.current_commands());
    }
}
