//! A fiber: attenuates and phase-shifts whatever 1550nm mode it is given,
//! according to its `length` and `n` (refractive index) parameters.

use std::collections::HashMap;

use clap::Parser;
use nalgebra::DMatrix;
use num_complex::Complex64;
use qsi_demos::{run_component, ComponentArgs};
use qsi_state::{matrix_to_json, JointState};
use qsi_transport::{ChannelQueryOutcome, MessageBody, ParamType, ParamValue};
use tracing::info;

/// Speed of light in vacuum, m/s.
const C0: f64 = 299_792_458.0;

struct Params {
    length: Option<f64>,
    n: Option<f64>,
}

/// Diagonal phase-evolution operator `exp(-i * phi * n)` for `n` in
/// `0..truncation`, and photon-loss Kraus operators for truncation-1
/// loss channels, matching the fiber's completely-positive map.
fn kraus_operators(truncation: usize, eta: f64, phi: f64) -> Vec<DMatrix<Complex64>> {
    let n_max = truncation - 1;

    let phase = |angle: f64| -> DMatrix<Complex64> {
        let mut m = DMatrix::<Complex64>::zeros(truncation, truncation);
        for n in 0..truncation {
            m[(n, n)] = Complex64::from_polar(1.0, -angle * n as f64);
        }
        m
    };
    let u_phi = phase(phi);
    let u_phi_half = phase(phi / 2.0);

    let mut a = DMatrix::<Complex64>::zeros(truncation, truncation);
    for n in 0..n_max {
        a[(n, n + 1)] = Complex64::new(1.0, 0.0);
    }

    let mut ops = Vec::with_capacity(truncation);
    for k in 0..truncation {
        if k == 0 {
            let scale = eta.powi(n_max as i32).sqrt();
            ops.push(&u_phi * Complex64::new(scale, 0.0));
        } else {
            let factor = ((1.0 - eta).powi(k as i32) * eta.powi((n_max - k) as i32)).sqrt();
            let mut a_k = DMatrix::<Complex64>::identity(truncation, truncation);
            for _ in 0..k {
                a_k = &a * &a_k;
            }
            let k_k = &u_phi_half * &a_k * &u_phi_half * Complex64::new(factor, 0.0);
            ops.push(k_k);
        }
    }
    ops
}

fn handle(msg: MessageBody, params: &mut Params) -> MessageBody {
    match msg {
        MessageBody::StateInit => MessageBody::StateInitResponse { states: vec![] },
        MessageBody::ParamQuery => {
            let mut types = HashMap::new();
            types.insert("length".to_string(), ParamType::Number);
            types.insert("n".to_string(), ParamType::Number);
            MessageBody::ParamQueryResponse { params: types }
        }
        MessageBody::ParamSet { params: values } => {
            if let Some(ParamValue::Number(v)) = values.get("length").map(|p| &p.value) {
                params.length = Some(*v);
            }
            if let Some(ParamValue::Number(v)) = values.get("n").map(|p| &p.value) {
                params.n = Some(*v);
            }
            MessageBody::ParamSetResponse
        }
        MessageBody::ChannelQuery { state, ports } => {
            let joint_state = match JointState::from_envelope(&state) {
                Ok(s) => s,
                Err(e) => {
                    return MessageBody::ChannelQueryResponse {
                        outcome: ChannelQueryOutcome::Refusal {
                            message: format!("malformed state: {e}"),
                        },
                    }
                }
            };
            let input_id = match ports.get("input").and_then(|s| s.parse().ok()) {
                Some(id) => id,
                None => {
                    return MessageBody::ChannelQueryResponse {
                        outcome: ChannelQueryOutcome::Refusal {
                            message: "no 'input' port binding was given".to_string(),
                        },
                    }
                }
            };
            let desc = match joint_state.get(input_id) {
                Ok(d) => d.clone(),
                Err(e) => {
                    return MessageBody::ChannelQueryResponse {
                        outcome: ChannelQueryOutcome::Refusal {
                            message: e.to_string(),
                        },
                    }
                }
            };

            if desc.wavelength() != Some(1550.0) {
                return MessageBody::ChannelQueryResponse {
                    outcome: ChannelQueryOutcome::Refusal {
                        message: format!(
                            "this component only interacts with 1550 nm modes, received {:?}",
                            desc.wavelength()
                        ),
                    },
                };
            }
            let (length, n) = match (params.length, params.n) {
                (Some(l), Some(n)) => (l, n),
                _ => {
                    return MessageBody::ChannelQueryResponse {
                        outcome: ChannelQueryOutcome::Refusal {
                            message: "this component requires 'length' and 'n' to be set"
                                .to_string(),
                        },
                    }
                }
            };

            let eta = 10f64.powf(-20.0 * 0.01 / length);
            let phi = (2.0 * std::f64::consts::PI * n * length) / (1550e-9);
            let operators = kraus_operators(desc.truncation(), eta, phi);
            let operation_time = length / (n * C0);

            MessageBody::ChannelQueryResponse {
                outcome: ChannelQueryOutcome::Channel {
                    kraus_operators: operators.iter().map(matrix_to_json).collect(),
                    kraus_state_indices: vec![input_id.to_string()],
                    error: Some(0.0),
                    retrigger: false,
                    retrigger_time: Some(0.0),
                    operation_time: Some(operation_time),
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
    let mut params = Params {
        length: None,
        n: None,
    };
    run_component(args.own_port, |msg| handle(msg, &mut params))
}
