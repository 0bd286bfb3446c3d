use std::fmt::Debug;
use thiserror::Error;

use crate::config::opts::OptsDecodeError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed ram map entry `{0}`, expected `component:bytes`")]
    MalformedRamEntry(String),

    #[error("invalid ram byte count for component `{component}`")]
    InvalidRamBytes {
        component: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("unknown package type `{0}`, expected `tar` or `jar`")]
    UnknownPackageType(String),

    #[error("cannot read internals config `{path}`")]
    UnreadableInternals {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse internals config `{path}`")]
    MalformedInternals {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("internals config `{path}` does not set `{key}`")]
    MissingInternalsKey { path: String, key: &'static str },

    #[error("jvm options decoding failed")]
    OptsDecode(#[from] OptsDecodeError),
}
