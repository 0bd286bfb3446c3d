//! Ownership and restart of the container's child processes. The
//! supervision table is the single shared mutable structure of the
//! executor: the reap loop restarts failed children through it while the
//! plan watcher kills and starts children through it, so every operation
//! takes the table lock.

mod error;

pub mod pidfile;

pub use error::SupervisorError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitStatus};
use nix::unistd::Pid;
use tracing::{error, info, warn};

use crate::command::stream::Event;
use crate::command::{CommandError, ProcessRunner};
use crate::planner::CommandSet;

const REAP_IDLE_NAP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RestartLimits {
    /// How often a child may be launched before the executor gives up.
    pub max_runs: u32,
    pub interval_between_runs: Duration,
}

impl Default for RestartLimits {
    fn default() -> Self {
        Self {
            max_runs: 100,
            interval_between_runs: Duration::from_secs(10),
        }
    }
}

/// Supervision state of one child. The process handle is exclusively
/// owned here; it is dropped when the child is reaped or deliberately
/// killed.
struct ChildRecord {
    #[allow(dead_code)]
    child: Child,
    name: String,
    argv: Vec<String>,
    attempts: u32,
}

pub struct Supervisor {
    table: Mutex<HashMap<u32, ChildRecord>>,
    limits: RestartLimits,
    events: Sender<Event>,
    workdir: PathBuf,
}

impl Supervisor {
    pub fn new(limits: RestartLimits, events: Sender<Event>) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            limits,
            events,
            workdir: PathBuf::from("."),
        }
    }

    /// Pid files and core dumps are looked up relative to this directory.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Launches every command in the set and registers it in the table
    /// with an attempt count of 1.
    pub fn start(&self, commands: &CommandSet) -> Result<(), SupervisorError> {
        let mut table = self.table.lock().unwrap();
        for (name, argv) in commands {
            self.launch_into(&mut table, name, argv, 1)?;
        }
        Ok(())
    }

    /// Stops supervising and terminates every named child. The record is
    /// removed before the signal goes out so that the reap loop cannot
    /// mistake the exit for a crash and restart it.
    pub fn kill(&self, commands: &CommandSet) {
        for name in commands.keys() {
            let removed = {
                let mut table = self.table.lock().unwrap();
                let pid = table
                    .iter()
                    .find(|(_, record)| &record.name == name)
                    .map(|(pid, _)| *pid);
                pid.and_then(|pid| table.remove(&pid).map(|record| (pid, record)))
            };

            match removed {
                Some((pid, record)) => {
                    info!(
                        child = %name,
                        pid, "killing {} process as {}", name, record.argv.join(" ")
                    );
                    if let Err(errno) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                        warn!(child = %name, pid, "could not signal child: {}", errno);
                    }
                }
                None => warn!(child = %name, "no running process to kill"),
            }
        }
    }

    /// Names and argvs of everything currently supervised.
    pub fn current_commands(&self) -> CommandSet {
        self.table
            .lock()
            .unwrap()
            .values()
            .map(|record| (record.name.clone(), record.argv.clone()))
            .collect()
    }

    /// Blocks reaping children forever, restarting failed ones until one
    /// of them exceeds the restart cap. Only ever returns an error.
    pub fn reap_loop(&self) -> Result<(), SupervisorError> {
        loop {
            match wait::wait() {
                Ok(WaitStatus::Exited(pid, code)) => {
                    self.on_child_exit(pid, format!("exit status {}", code))?;
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    self.on_child_exit(pid, format!("signal {:?}", sig))?;
                }
                Ok(_) => {}
                Err(Errno::ECHILD) => thread::sleep(REAP_IDLE_NAP),
                Err(Errno::EINTR) => {}
                Err(errno) => return Err(SupervisorError::Wait(errno)),
            }
        }
    }

    fn on_child_exit(&self, pid: Pid, status: String) -> Result<(), SupervisorError> {
        let pid = pid.as_raw() as u32;
        let mut table = self.table.lock().unwrap();
        let Some(record) = table.remove(&pid) else {
            // deliberately killed, or not one of ours
            return Ok(());
        };

        info!(
            child = %record.name,
            pid,
            attempts = record.attempts,
            "{} exited with {}",
            record.name,
            status
        );
        self.make_core_readable(pid);

        if record.attempts + 1 > self.limits.max_runs {
            error!(child = %record.name, "{} exited too many times", record.name);
            return Err(SupervisorError::Exhausted { name: record.name });
        }

        thread::sleep(self.limits.interval_between_runs);
        self.launch_into(&mut table, &record.name, &record.argv, record.attempts + 1)?;
        Ok(())
    }

    /// Spawns one child, consuming an attempt per failed spawn, and
    /// registers the resulting pid. The old table entry for a restarted
    /// child must already be gone when this is called.
    fn launch_into(
        &self,
        table: &mut HashMap<u32, ChildRecord>,
        name: &str,
        argv: &[String],
        mut attempts: u32,
    ) -> Result<u32, SupervisorError> {
        loop {
            info!(child = name, attempts, "running {} process as {}", name, argv.join(" "));
            match self.spawn(name, argv) {
                Ok(child) => {
                    let pid = child.id();
                    table.insert(
                        pid,
                        ChildRecord {
                            child,
                            name: name.to_string(),
                            argv: argv.to_vec(),
                            attempts,
                        },
                    );
                    pidfile::write_pid_in(&self.workdir, name, pid).map_err(|source| {
                        SupervisorError::PidFile {
                            name: name.to_string(),
                            source,
                        }
                    })?;
                    return Ok(pid);
                }
                Err(CommandError::SpawnFailure { source, .. }) => {
                    warn!(child = name, attempts, "child failed to spawn: {}", source);
                    if attempts + 1 > self.limits.max_runs {
                        return Err(SupervisorError::Exhausted {
                            name: name.to_string(),
                        });
                    }
                    attempts += 1;
                    thread::sleep(self.limits.interval_between_runs);
                }
                Err(err) => return Err(SupervisorError::Command(err)),
            }
        }
    }

    fn spawn(&self, name: &str, argv: &[String]) -> Result<Child, CommandError> {
        let runner = ProcessRunner::new(name, argv)?
            .start()?
            .stream(&self.events)?;
        Ok(runner.into_child())
    }

    fn make_core_readable(&self, pid: u32) {
        let core = self.workdir.join(format!("core.{}", pid));
        if !core.is_file() {
            return;
        }
        let readable = match std::fs::metadata(&core) {
            Ok(metadata) => {
                use std::os::unix::fs::PermissionsExt;
                let mut permissions = metadata.permissions();
                permissions.set_mode(permissions.mode() | 0o444);
                std::fs::set_permissions(&core, permissions)
            }
            Err(err) => Err(err),
        };
        if let Err(err) = readable {
            warn!(pid, "could not make {} readable: {}", core.display(), err);
        }
    }
}
