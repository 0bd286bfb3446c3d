mod error;

pub mod logger;
pub mod processrunner;
pub mod stream;

pub use error::CommandError;
pub use processrunner::ProcessRunner;

use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;

use stream::Event;

/// This trait represents the capability of an event receiver to log child
/// output. The receiver consumes itself as the logging is done in a
/// separate thread; the thread handle is returned.
pub trait EventLogger {
    fn log(self, rcv: Receiver<Event>) -> JoinHandle<()>;
}
