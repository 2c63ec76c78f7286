//! Errors raised by the coordinator facade: the engine's errors plus the
//! transport/lifecycle conditions that surround it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Engine(#[from] qsi_core::EngineError),

    #[error(transparent)]
    Transport(#[from] qsi_transport::TransportError),

    #[error("no handle registered for component {0}")]
    UnknownComponent(String),

    #[error("a query is already in flight for component {0}")]
    QueryInFlight(String),

    #[error("component refused the query: {0}")]
    Refused(String),

    #[error("failed to spawn component process: {0}")]
    SpawnFailed(String),
}
