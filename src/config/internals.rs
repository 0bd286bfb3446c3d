use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

pub const LOGGING_DIRECTORY_KEY: &str = "heron.logging.directory";

#[derive(Debug, Deserialize)]
struct Internals {
    #[serde(rename = "heron.logging.directory")]
    logging_directory: Option<String>,
}

/// Reads the internals config file and returns the configured logging
/// directory. The rest of the file belongs to the children and is ignored.
pub fn load_logging_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadableInternals {
        path: path.display().to_string(),
        source,
    })?;

    let internals: Internals =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::MalformedInternals {
            path: path.display().to_string(),
            source,
        })?;

    internals
        .logging_directory
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::MissingInternalsKey {
            path: path.display().to_string(),
            key: LOGGING_DIRECTORY_KEY,
        })
}
