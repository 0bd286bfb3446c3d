use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::stream::{Event, OutputEvent};
use super::EventLogger;

/// Forwards child output lines into the executor's own log stream.
#[derive(Default)]
pub struct StdEventReceiver;

impl EventLogger for StdEventReceiver {
    fn log(self, rcv: Receiver<Event>) -> JoinHandle<()> {
        thread::spawn(move || {
            rcv.iter().for_each(|event| match event.output {
                OutputEvent::Stdout(line) => {
                    debug!(child = event.metadata.name(), "{}", line);
                }
                OutputEvent::Stderr(line) => {
                    error!(child = event.metadata.name(), "{}", line);
                }
            })
        })
    }
}
