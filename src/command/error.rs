use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("empty argv for child `{0}`")]
    EmptyArgv(String),

    #[error("child `{name}` failed to spawn")]
    SpawnFailure {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stdio for child `{0}` was not piped")]
    NotPiped(String),
}
