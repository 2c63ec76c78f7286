//! Error taxonomy shared by the engine and its callers.

use thiserror::Error;

/// Result type for engine-layer operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the Subsystem Descriptor and Joint State types.
///
/// All variants are raised before any mutation takes place, so a failed
/// operation never leaves a Joint State partially updated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A descriptor's fields failed validation (missing kind-specific
    /// attributes, non-positive truncation).
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Composing would introduce a subsystem id already present.
    #[error("duplicate subsystem: {0}")]
    DuplicateSubsystem(String),

    /// An operation referenced a subsystem id not present in `props`.
    #[error("unknown subsystem: {0}")]
    UnknownSubsystem(String),

    /// A Kraus matrix's side disagreed with the product of target
    /// truncations.
    #[error("channel mismatch: {0}")]
    ChannelMismatch(String),

    /// A serialized envelope was internally inconsistent.
    #[error("malformed state: {0}")]
    MalformedState(String),
}

impl EngineError {
    /// Build an [`EngineError::InvalidDescriptor`].
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Build an [`EngineError::DuplicateSubsystem`].
    pub fn duplicate_subsystem(id: impl Into<String>) -> Self {
        Self::DuplicateSubsystem(id.into())
    }

    /// Build an [`EngineError::UnknownSubsystem`].
    pub fn unknown_subsystem(id: impl Into<String>) -> Self {
        Self::UnknownSubsystem(id.into())
    }

    /// Build an [`EngineError::ChannelMismatch`].
    pub fn channel_mismatch(msg: impl Into<String>) -> Self {
        Self::ChannelMismatch(msg.into())
    }

    /// Build an [`EngineError::MalformedState`].
    pub fn malformed_state(msg: impl Into<String>) -> Self {
        Self::MalformedState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_variant() {
        let err = EngineError::invalid_descriptor("truncation must be positive");
        assert!(err.to_string().contains("invalid descriptor"));

        let err = EngineError::unknown_subsystem("abc-123");
        assert!(err.to_string().contains("unknown subsystem"));
    }
}
