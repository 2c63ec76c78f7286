//! Transport and lifecycle errors.
//!
//! These follow a different policy than the engine's errors: a connection
//! refusal is retried, a schema-validation failure is logged and the
//! offending message dropped, a dead component is reaped. None of this is
//! recoverable in the sense the engine's errors are — by the time one of
//! these surfaces, the caller has already lost a round trip.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("connection to component refused after {attempts} attempts")]
    ConnectionRefused { attempts: u32 },

    #[error("timed out waiting for a reply")]
    Timeout,
}
