//! Process-group leadership, stdio redirection and startup preparation.
//! The executor owns its process group so that one group-wide SIGTERM,
//! sent on every exit path, takes the whole container down with it.

pub mod signal;

pub use signal::SignalManager;

use std::fs::{self, OpenOptions};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::process::Command;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::{setpgid, Pid};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ContainerContext, PackageKind};
use crate::supervisor::pidfile;

pub const STDOUT_FILE: &str = "heron-executor.stdout";
pub const STDERR_FILE: &str = "heron-executor.stderr";

/// Directory the children write their gc logs into, relative to the
/// working directory; the executor only guarantees it exists.
const GC_LOG_DIR: &str = "log-files";

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("cannot open `{path}` for redirection")]
    Redirect {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot duplicate `{path}` onto fd {fd}")]
    Dup {
        path: &'static str,
        fd: RawFd,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("cannot become process group leader")]
    ProcessGroup(#[source] nix::errno::Errno),

    #[error("cannot prepare `{path}`")]
    Prepare {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot record the executor pid")]
    OwnPid(#[source] std::io::Error),

    #[error("cannot extract topology artifact `{artifact}`")]
    Extract {
        artifact: String,
        #[source]
        source: std::io::Error,
    },

    #[error("extracting topology artifact `{artifact}` failed with {status}")]
    ExtractStatus {
        artifact: String,
        status: std::process::ExitStatus,
    },
}

/// Sends stdout and stderr to append-mode files in the working directory.
pub fn redirect_std_streams() -> Result<(), LifecycleError> {
    redirect(STDOUT_FILE, libc::STDOUT_FILENO)?;
    redirect(STDERR_FILE, libc::STDERR_FILENO)
}

fn redirect(path: &'static str, fd: RawFd) -> Result<(), LifecycleError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LifecycleError::Redirect { path, source })?;
    nix::unistd::dup2(file.as_raw_fd(), fd)
        .map_err(|source| LifecycleError::Dup { path, fd, source })?;
    Ok(())
}

/// The executor leads its own process group so that a single group signal
/// reaches every transitively spawned child.
pub fn become_group_leader() -> Result<(), LifecycleError> {
    setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(LifecycleError::ProcessGroup)?;
    info!("executor became its process group leader");
    Ok(())
}

/// Best-effort SIGTERM to the whole group, ourselves included. Children
/// that detached from the group are out of reach.
pub fn terminate_group() {
    if let Err(errno) = killpg(Pid::from_raw(0), Signal::SIGTERM) {
        warn!("could not signal the process group: {}", errno);
    }
}

/// Creates the log directories, marks the shipped binaries executable and
/// unpacks the topology artifact when it arrived as a tarball.
pub fn prepare_launch(context: &ContainerContext, workdir: &Path) -> Result<(), LifecycleError> {
    let gc_log_dir = workdir.join(GC_LOG_DIR);
    for dir in [context.log_dir.as_path(), gc_log_dir.as_path()] {
        fs::create_dir_all(dir).map_err(|source| LifecycleError::Prepare {
            path: dir.display().to_string(),
            source,
        })?;
    }

    for binary in [
        &context.tmaster_binary,
        &context.stmgr_binary,
        &context.shell_binary,
    ] {
        make_executable(Path::new(binary))?;
    }

    if context.package.kind == PackageKind::Tar && !context.is_master() {
        extract_artifact(&context.package.artifact_path, workdir)?;
    }
    Ok(())
}

/// Records the executor's own pid next to its children's pid files.
pub fn record_own_pid(workdir: &Path, shard: u32) -> Result<(), LifecycleError> {
    let name = format!("heron-executor-{}", shard);
    pidfile::write_pid_in(workdir, &name, std::process::id()).map_err(LifecycleError::OwnPid)
}

fn make_executable(path: &Path) -> Result<(), LifecycleError> {
    use std::os::unix::fs::PermissionsExt;

    let prepare_err = |source| LifecycleError::Prepare {
        path: path.display().to_string(),
        source,
    };
    let metadata = fs::metadata(path).map_err(prepare_err)?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(prepare_err)
}

fn extract_artifact(artifact: &str, workdir: &Path) -> Result<(), LifecycleError> {
    info!(artifact, "extracting topology package");
    let status = Command::new("tar")
        .args(["-xf", artifact])
        .current_dir(workdir)
        .status()
        .map_err(|source| LifecycleError::Extract {
            artifact: artifact.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(LifecycleError::ExtractStatus {
            artifact: artifact.to_string(),
            status,
        });
    }
    Ok(())
}
