//! Diffs the running command set against the planned one and drives the
//! supervisor through the delta, kills strictly before starts.

use tracing::info;

use crate::planner::commands::TMASTER_NAME;
use crate::planner::CommandSet;
use crate::supervisor::{Supervisor, SupervisorError};

/// Disjoint reconciliation sets. `keep` and `start` together cover the
/// desired set; `kill` and `keep` together cover the current one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandChanges {
    pub kill: CommandSet,
    pub keep: CommandSet,
    pub start: CommandSet,
}

pub fn reconcile(current: &CommandSet, desired: &CommandSet) -> CommandChanges {
    let mut changes = CommandChanges::default();

    for (name, argv) in current {
        // the tmaster holds an in-memory view of stream-manager
        // membership, so it goes down on every plan change even when its
        // own argv survived verbatim
        let keep = name != TMASTER_NAME && desired.get(name) == Some(argv);
        if keep {
            changes.keep.insert(name.clone(), argv.clone());
        } else {
            changes.kill.insert(name.clone(), argv.clone());
        }
    }

    for (name, argv) in desired {
        if !changes.keep.contains_key(name) {
            changes.start.insert(name.clone(), argv.clone());
        }
    }

    changes
}

/// Applies a delta. All kills complete before any start so like-named
/// successors never fight their predecessors over ports.
pub fn apply(supervisor: &Supervisor, changes: &CommandChanges) -> Result<(), SupervisorError> {
    info!(
        kill = changes.kill.len(),
        keep = changes.keep.len(),
        start = changes.start.len(),
        "applying command changes"
    );
    supervisor.kill(&changes.kill);
    supervisor.start(&changes.start)
}
