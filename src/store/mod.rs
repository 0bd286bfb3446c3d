//! Seam to the coordination stores that deliver packing plans. The
//! executor only requires at-least-once, per-topology-ordered delivery;
//! the transport behind the trait is pluggable.

pub mod file;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot watch packing plans under `{path}`")]
    Unwatchable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invoked with the encoded instance distribution on every delivery.
/// Redeliveries of an unchanged plan are expected; the receiver is
/// idempotent.
pub type PlanCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub trait StateStore: Send {
    fn name(&self) -> &str;

    /// Starts watching the packing plan of `topology` and keeps invoking
    /// `callback` until the executor dies. A failing read inside the
    /// watch is logged and retried, never surfaced.
    fn watch_packing_plan(&self, topology: &str, callback: PlanCallback)
        -> Result<(), StoreError>;
}
