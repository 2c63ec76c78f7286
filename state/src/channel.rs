//! The Channel Descriptor: the CPTP map a component hands back to a caller.

use nalgebra::DMatrix;
use num_complex::Complex64;
use uuid::Uuid;

use qsi_core::{EngineError, Result, SubsystemDescriptor};

use crate::joint_state::JointState;

/// An ordered set of Kraus matrices addressed to an ordered set of
/// subsystem ids, as returned by a component in response to a channel
/// query.
///
/// Completeness (`sum K_i^dagger K_i == I` on the target subspace) is the
/// producer's responsibility; this type does not check it.
#[derive(Debug, Clone)]
pub struct ChannelDescriptor {
    pub kraus: Vec<DMatrix<Complex64>>,
    pub targets: Vec<Uuid>,
    pub error: Option<f64>,
    pub operation_time: Option<f64>,
    pub retrigger: bool,
    pub retrigger_time: Option<f64>,
}

impl ChannelDescriptor {
    pub fn new(kraus: Vec<DMatrix<Complex64>>, targets: Vec<Uuid>) -> Self {
        Self {
            kraus,
            targets,
            error: None,
            operation_time: None,
            retrigger: false,
            retrigger_time: None,
        }
    }

    /// Resolve `targets` against `state` and check that every Kraus
    /// matrix's side equals the product of the resolved target
    /// truncations, in target order. Fails with
    /// [`EngineError::ChannelMismatch`] if any target id is absent from
    /// `state` or the Kraus matrices disagree on side. The consumer
    /// performs this check, not the producer.
    pub fn resolve(&self, state: &JointState) -> Result<Vec<SubsystemDescriptor>> {
        if self.targets.is_empty() {
            return Err(EngineError::channel_mismatch(
                "a channel must address at least one target",
            ));
        }
        let mut resolved = Vec::with_capacity(self.targets.len());
        for id in &self.targets {
            let desc = state.get(*id).map_err(|_| {
                EngineError::channel_mismatch(format!(
                    "target subsystem {id} is not present in the joint state"
                ))
            })?;
            resolved.push(desc.clone());
        }
        let expected: usize = resolved.iter().map(|d| d.truncation()).product();
        for k in &self.kraus {
            if k.nrows() != expected || k.ncols() != expected {
                return Err(EngineError::channel_mismatch(format!(
                    "kraus operator has side {} but targets require {}",
                    k.nrows(),
                    expected
                )));
            }
        }
        if let Some((first, rest)) = self.kraus.split_first() {
            for k in rest {
                if k.nrows() != first.nrows() {
                    return Err(EngineError::channel_mismatch(
                        "kraus operators in a channel must share the same side",
                    ));
                }
            }
        }
        Ok(resolved)
    }

    /// Validate against `state` and apply in place.
    pub fn apply(&self, state: &mut JointState) -> Result<()> {
        let targets = self.resolve(state)?;
        state.apply_channel(&self.kraus, &targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsi_core::SubsystemKind;

    #[test]
    fn resolve_rejects_unknown_target() {
        let desc = SubsystemDescriptor::new(SubsystemKind::Internal, 2, None, None).unwrap();
        let state = JointState::ground(desc);
        let channel = ChannelDescriptor::new(vec![DMatrix::identity(2, 2)], vec![Uuid::new_v4()]);
        assert!(channel.resolve(&state).is_err());
    }

    #[test]
    fn resolve_rejects_side_mismatch() {
        let desc = SubsystemDescriptor::new(SubsystemKind::Internal, 2, None, None).unwrap();
        let id = desc.id();
        let state = JointState::ground(desc);
        let channel = ChannelDescriptor::new(vec![DMatrix::identity(3, 3)], vec![id]);
        assert!(channel.resolve(&state).is_err());
    }

    #[test]
    fn apply_delegates_to_joint_state() {
        let desc = SubsystemDescriptor::new(SubsystemKind::Internal, 2, None, None).unwrap();
        let id = desc.id();
        let mut state = JointState::ground(desc);
        let channel = ChannelDescriptor::new(vec![DMatrix::identity(2, 2)], vec![id]);
        let before = state.rho().clone();
        channel.apply(&mut state).unwrap();
        assert_eq!(state.rho(), &before);
    }
}
