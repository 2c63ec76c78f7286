//! A color center: an internal (non-optical) two-level memory. Exposes a
//! truncation-2 subsystem at `state_init` and, once its field/temperature
//! parameters are set, answers channel queries with the identity channel
//! on that subsystem (a placeholder for the continuous-time physics this
//! substrate does not simulate).

use std::collections::HashMap;

use clap::Parser;
use nalgebra::DMatrix;
use qsi_core::{SubsystemDescriptor, SubsystemKind};
use qsi_demos::{run_component, ComponentArgs};
use qsi_transport::{ChannelQueryOutcome, MessageBody, ParamType, ParamValue};
use tracing::info;

struct Params {
    subsystem: SubsystemDescriptor,
    b0: Option<f64>,
    temp: Option<f64>,
}

fn handle(msg: MessageBody, params: &mut Params) -> MessageBody {
    match msg {
        MessageBody::StateInit => {
            let state = qsi_state::JointState::ground(params.subsystem.clone());
            MessageBody::StateInitResponse {
                states: vec![state.to_envelope()],
            }
        }
        MessageBody::ParamQuery => {
            let mut types = HashMap::new();
            types.insert("b0".to_string(), ParamType::Number);
            types.insert("temp".to_string(), ParamType::Number);
            MessageBody::ParamQueryResponse { params: types }
        }
        MessageBody::ParamSet { params: values } => {
            if let Some(ParamValue::Number(v)) = values.get("b0").map(|p| &p.value) {
                params.b0 = Some(*v);
            }
            if let Some(ParamValue::Number(v)) = values.get("temp").map(|p| &p.value) {
                params.temp = Some(*v);
            }
            MessageBody::ParamSetResponse
        }
        MessageBody::ChannelQuery { .. } => {
            if params.b0.is_none() || params.temp.is_none() {
                return MessageBody::ChannelQueryResponse {
                    outcome: ChannelQueryOutcome::Refusal {
                        message: "field b0 or temperature was not given".to_string(),
                    },
                };
            }
            let d = params.subsystem.truncation();
            MessageBody::ChannelQueryResponse {
                outcome: ChannelQueryOutcome::Channel {
                    kraus_operators: vec![qsi_state::matrix_to_json(&DMatrix::identity(d, d))],
                    kraus_state_indices: vec![params.subsystem.id().to_string()],
                    error: Some(0.0),
                    retrigger: false,
                    retrigger_time: None,
                    operation_time: None,
                },
            }
        }
        other => {
            info!("unhandled message: {other:?}");
            MessageBody::TerminateResponse
        }
    }
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();
    let args = ComponentArgs::parse();
    let subsystem = SubsystemDescriptor::new(SubsystemKind::Internal, 2, None, None)
        .expect("a truncation-2 internal descriptor is always valid");
    let mut params = Params {
        subsystem,
        b0: None,
        temp: None,
    };
    run_component(args.own_port, |msg| handle(msg, &mut params))
}
