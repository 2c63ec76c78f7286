//! Process supervision, socket transport, and the Coordinator Façade that
//! sits in front of the joint-state engine.
//!
//! This crate is deliberately thin: every interesting invariant lives in
//! [`qsi_state`]. What's here is orchestration — spawning component
//! processes, negotiating their parameters, and turning a component's
//! wire-format reply into a [`qsi_state::ChannelDescriptor`] the engine
//! can apply.

pub mod component;
pub mod error;
pub mod facade;
pub mod port;

pub use component::{ComponentHandle, ParamState};
pub use error::{CoordinatorError, Result};
pub use facade::{CoordinatorFacade, QueryResult};
pub use port::{find_empty_port, is_port_open};
