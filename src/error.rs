use std::fmt::Debug;
use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;
use crate::logging::LoggingError;
use crate::planner::PlannerError;
use crate::store::StoreError;
use crate::supervisor::SupervisorError;

/// Anything fatal the binary can die of. All of it maps to exit code 1;
/// signal-driven termination exits with the signal number instead.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("logging setup failed")]
    Logging(#[from] LoggingError),

    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("planning error")]
    Planner(#[from] PlannerError),

    #[error("lifecycle error")]
    Lifecycle(#[from] LifecycleError),

    #[error("supervision error")]
    Supervisor(#[from] SupervisorError),

    #[error("state store error")]
    Store(#[from] StoreError),
}
