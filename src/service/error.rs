use thiserror::Error;

use crate::{
    lifecycle::{Hook, LifecycleError},
    session::SessionInfoError,
    status::StatusError,
    traits::TunnelError,
    wireguard::BuildError,
};

/// Control API operation an error was raised by. Error codes are only
/// unique within one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Disconnect,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Resource,
    Hook,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("{0}")]
    Validation(String),
    #[error("loading status: {0}")]
    LoadStatus(#[source] StatusError),
    #[error("service is already running on interface {0}")]
    AlreadyConnected(String),
    #[error(transparent)]
    Decode(#[from] SessionInfoError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("saving status: {0}")]
    SaveStatus(#[source] StatusError),
    #[error("removing status: {0}")]
    RemoveStatus(#[source] StatusError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("querying transfer: {0}")]
    Transfer(#[source] TunnelError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Malformed(_) | ServiceError::Validation(_) | ServiceError::Decode(_) => {
                ErrorKind::Validation
            }
            ServiceError::AlreadyConnected(_) => ErrorKind::Conflict,
            ServiceError::Lifecycle(e) if e.hook().is_some() => ErrorKind::Hook,
            _ => ErrorKind::Resource,
        }
    }

    pub fn code(&self, op: Operation) -> u32 {
        use Operation::*;
        use ServiceError::*;

        match (op, self) {
            (Connect, Malformed(_)) => 1001,
            (Connect, Validation(_)) => 1002,
            (Connect, LoadStatus(_)) => 1003,
            (Connect, AlreadyConnected(_)) => 1004,
            (Connect, Decode(_)) => 1005,
            (Connect, Build(BuildError::Network(_))) => 1006,
            (Connect, Build(BuildError::NoFreePort(_))) => 1007,
            (Connect, SaveStatus(_)) => 1008,
            (Connect, Lifecycle(e)) => match e.hook() {
                Some(Hook::PreUp) => 1009,
                Some(Hook::Up) => 1010,
                Some(Hook::PostUp) => 1011,
                _ => 1012,
            },

            (Disconnect, LoadStatus(_)) => 1001,
            (Disconnect, Lifecycle(e)) => match e.hook() {
                Some(Hook::PreDown) => 1002,
                Some(Hook::Down) => 1003,
                Some(Hook::PostDown) => 1004,
                _ => 1006,
            },
            (Disconnect, RemoveStatus(_)) => 1005,

            (Status, LoadStatus(_)) => 1001,
            (Status, Transfer(_)) => 1002,
            (Status, Lifecycle(_)) => 1003,

            _ => 1000,
        }
    }
}
