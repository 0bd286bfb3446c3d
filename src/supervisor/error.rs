use std::fmt::Debug;
use thiserror::Error;

use crate::command::CommandError;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("child `{name}` exited too many times")]
    Exhausted { name: String },

    #[error("cannot wait for children")]
    Wait(#[source] nix::errno::Errno),

    #[error("command error")]
    Command(#[from] CommandError),

    #[error("cannot write pid file for `{name}`")]
    PidFile {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
