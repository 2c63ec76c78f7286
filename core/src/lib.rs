//! Shared types for the joint quantum-state simulation substrate.
//!
//! This crate provides the foundational pieces every other crate in the
//! workspace depends on:
//!
//! - [`SubsystemDescriptor`] — identifies one tensor factor of a Joint
//!   State.
//! - [`EngineError`] — the five-variant error taxonomy raised by the
//!   engine layer, shared so callers never need to match on crate-local
//!   duplicates.
//! - the complex-number type alias and floating-point tolerances used
//!   throughout the engine and its tests.

pub mod descriptor;
pub mod error;

pub use descriptor::{Polarization, SubsystemDescriptor, SubsystemKind};
pub use error::{EngineError, Result};

/// Complex scalar type used throughout the engine.
pub type Complex = num_complex::Complex64;

/// Tolerance for trace-preservation checks across a channel application.
pub const TRACE_TOLERANCE: f64 = 1e-10;

/// Tolerance for reorder and identity-channel round-trips.
pub const REORDER_TOLERANCE: f64 = 1e-12;

/// Tolerance for envelope round-trips.
pub const ENVELOPE_TOLERANCE: f64 = 1e-15;

/// Crate version, re-exported for diagnostic output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
