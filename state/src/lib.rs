//! The joint quantum-state engine.
//!
//! [`JointState`] owns an ordered list of Subsystem Descriptors and a
//! dense complex density matrix whose side equals the product of their
//! truncations. It supports tensor composition ([`JointState::compose`]),
//! factor reordering ([`JointState::reorder`]), Kraus-channel application
//! ([`JointState::apply_channel`]), and partial trace
//! ([`JointState::reduce`]), plus lossless round-tripping through
//! [`StateEnvelope`].
//!
//! [`ChannelDescriptor`] is the value a component hands back in response to
//! a channel query: an ordered set of Kraus matrices and the subsystem ids
//! they address.

pub mod channel;
pub mod envelope;
pub mod joint_state;

pub use channel::ChannelDescriptor;
pub use envelope::{matrix_from_json, matrix_to_json, SerializedMatrix, StateEnvelope};
pub use joint_state::JointState;
