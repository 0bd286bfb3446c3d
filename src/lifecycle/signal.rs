use std::sync::atomic::{AtomicI32, Ordering::Relaxed};
use std::thread::{self, sleep, JoinHandle};
use std::time::Duration;

use tracing::info;

use super::terminate_group;

static RECEIVED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Installs the termination handlers and turns a received signal into a
/// group-wide shutdown. The executor exits with the signal number; no
/// attempt is made to wait for the children.
pub struct SignalManager;

impl SignalManager {
    #[cfg(target_family = "unix")]
    pub fn shutdown_handle() -> JoinHandle<()> {
        register_shutdown_signal_handlers();

        thread::spawn(|| loop {
            let signum = received_signal();
            if signum != 0 {
                info!(
                    signal = signum,
                    "executor terminated; exiting all processes in the group"
                );
                terminate_group();
                std::process::exit(signum);
            }

            sleep(Duration::from_millis(500));
        })
    }

    #[cfg(not(target_family = "unix"))]
    pub fn shutdown_handle() -> JoinHandle<()> {
        unimplemented!("process groups are a unix concept")
    }
}

fn received_signal() -> i32 {
    RECEIVED_SIGNAL.load(Relaxed)
}

#[cfg(target_family = "unix")]
fn register_shutdown_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, handle_shutdown_signal as usize);
        libc::signal(libc::SIGINT, handle_shutdown_signal as usize);
    }
}

#[cfg(target_family = "unix")]
extern "C" fn handle_shutdown_signal(signum: i32) {
    // re-register as soon as possible so a second signal cannot hit the
    // default action mid-shutdown
    register_shutdown_signal_handlers();
    RECEIVED_SIGNAL.store(signum, Relaxed);
}

#[cfg(target_family = "unix")]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn catches_sigterm() {
        register_shutdown_signal_handlers();
        unsafe {
            libc::raise(libc::SIGTERM);
        }
        assert_eq!(libc::SIGTERM, received_signal());
    }

    #[test]
    #[serial]
    fn catches_sigint() {
        register_shutdown_signal_handlers();
        unsafe {
            libc::raise(libc::SIGINT);
        }
        assert_eq!(libc::SIGINT, received_signal());
    }
}
