//! The Coordinator Façade: turns "query component X on ports P, then
//! apply" into a single call, on behalf of a caller holding a Joint
//! State.

use std::collections::HashMap;
use std::path::Path;

use qsi_state::{ChannelDescriptor, JointState};
use qsi_transport::{ChannelQueryOutcome, MessageBody};
use uuid::Uuid;

use crate::component::ComponentHandle;
use crate::error::{CoordinatorError, Result};
use crate::port::find_empty_port;

/// The resolved result of a channel query: either a usable channel, or a
/// reason the component declined to produce one.
pub enum QueryResult {
    Channel(ChannelDescriptor),
    Refused { message: String },
    RetriggerOnly { retrigger: bool, retrigger_time: Option<f64> },
}

/// Owns the set of registered component handles and drives the
/// register/query/apply lifecycle. Single-threaded: the engine
/// underneath is synchronous and not safe for concurrent mutation, so
/// this facade does not attempt to parallelize component queries either.
pub struct CoordinatorFacade {
    coordinator_port: u16,
    handles: HashMap<String, ComponentHandle>,
}

impl CoordinatorFacade {
    pub fn new(coordinator_port: u16) -> Self {
        Self {
            coordinator_port,
            handles: HashMap::new(),
        }
    }

    /// Spawn `component` and connect to it, assigning it a fresh
    /// ephemeral port. Returns the handle id to use in subsequent calls.
    pub fn register(&mut self, id: impl Into<String>, component: &Path) -> Result<String> {
        let id = id.into();
        let own_port =
            find_empty_port().map_err(|e| CoordinatorError::SpawnFailed(e.to_string()))?;
        let handle =
            ComponentHandle::spawn(id.clone(), component, own_port, self.coordinator_port)?;
        self.handles.insert(id.clone(), handle);
        Ok(id)
    }

    fn handle_mut(&mut self, id: &str) -> Result<&mut ComponentHandle> {
        self.handles
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::UnknownComponent(id.to_string()))
    }

    /// Send the current parameters to a component and wait for
    /// acknowledgement, transitioning its parameter record to `Ready`.
    pub fn set_params(
        &mut self,
        id: &str,
        params: HashMap<String, qsi_transport::ParamValue>,
    ) -> Result<()> {
        let coordinator_port = self.coordinator_port;
        let params: HashMap<String, qsi_transport::ParamSetValue> = params
            .into_iter()
            .map(|(name, value)| (name, qsi_transport::ParamSetValue::new(value)))
            .collect();
        let handle = self.handle_mut(id)?;
        handle.request(coordinator_port, MessageBody::ParamSet { params })?;
        handle.mark_ready();
        Ok(())
    }

    /// Query `handle` for its channel on the given port bindings, against
    /// the caller's current `state`. Sends a `channel_query` envelope
    /// carrying the state and bindings; resolves whichever of the three
    /// response shapes came back.
    pub fn query_channel(
        &mut self,
        id: &str,
        state: &JointState,
        port_bindings: &HashMap<String, Uuid>,
    ) -> Result<QueryResult> {
        let coordinator_port = self.coordinator_port;
        let ports: HashMap<String, String> = port_bindings
            .iter()
            .map(|(name, uuid)| (name.clone(), uuid.to_string()))
            .collect();
        let handle = self.handle_mut(id)?;
        let reply = handle.request(
            coordinator_port,
            MessageBody::ChannelQuery {
                state: state.to_envelope(),
                ports,
            },
        )?;

        let outcome = match reply.body {
            MessageBody::ChannelQueryResponse { outcome } => outcome,
            other => {
                return Err(CoordinatorError::Refused(format!(
                    "expected a channel_query_response, got {other:?}"
                )))
            }
        };

        Ok(match outcome {
            ChannelQueryOutcome::Channel {
                kraus_operators,
                kraus_state_indices,
                error,
                retrigger,
                retrigger_time,
                operation_time,
            } => {
                let kraus = kraus_operators
                    .iter()
                    .map(|m| qsi_state::matrix_from_json(m))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let targets = kraus_state_indices
                    .iter()
                    .map(|s| {
                        s.parse::<Uuid>().map_err(|_| {
                            CoordinatorError::Refused(format!("malformed target id {s}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let mut descriptor = ChannelDescriptor::new(kraus, targets);
                descriptor.error = error;
                descriptor.retrigger = retrigger;
                descriptor.retrigger_time = retrigger_time;
                descriptor.operation_time = operation_time;
                QueryResult::Channel(descriptor)
            }
            ChannelQueryOutcome::Refusal { message } => QueryResult::Refused { message },
            ChannelQueryOutcome::RetriggerOnly {
                retrigger,
                retrigger_time,
            } => QueryResult::RetriggerOnly {
                retrigger,
                retrigger_time,
            },
        })
    }

    /// Apply a resolved channel descriptor to `state`.
    pub fn apply(&self, state: &mut JointState, channel: &ChannelDescriptor) -> Result<()> {
        channel.apply(state).map_err(CoordinatorError::from)
    }

    /// Terminate every registered component, graceful-then-forced.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.handles.drain() {
            let _ = handle.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_mut_rejects_unknown_component() {
        let mut facade = CoordinatorFacade::new(9000);
        assert!(facade.handle_mut("nonexistent").is_err());
    }
}
