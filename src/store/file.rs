use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{PlanCallback, StateStore, StoreError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// File-backed coordination store. The packing plan of a topology lives
/// at `<root>/packingplans/<topology>`; every observed content change is
/// one delivery.
pub struct FileStateStore {
    name: String,
    root: PathBuf,
    poll_interval: Duration,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: "local".to_string(),
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn plan_path(&self, topology: &str) -> PathBuf {
        self.root.join("packingplans").join(topology)
    }
}

impl StateStore for FileStateStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn watch_packing_plan(
        &self,
        topology: &str,
        callback: PlanCallback,
    ) -> Result<(), StoreError> {
        let path = self.plan_path(topology);
        let store = self.name.clone();
        let poll_interval = self.poll_interval;
        info!(store = %store, path = %path.display(), "watching packing plan");

        thread::spawn(move || {
            let mut last_seen: Option<String> = None;
            loop {
                match fs::read_to_string(&path) {
                    Ok(content) => {
                        let content = content.trim_end().to_string();
                        if last_seen.as_deref() != Some(content.as_str()) {
                            debug!(store = %store, "packing plan delivery");
                            (*callback)(&content);
                            last_seen = Some(content);
                        }
                    }
                    // nothing published yet
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => {
                        // treated as a store hiccup, the next poll retries
                        warn!(store = %store, path = %path.display(), "cannot read packing plan: {}", err);
                    }
                }
                thread::sleep(poll_interval);
            }
        });
        Ok(())
    }
}
