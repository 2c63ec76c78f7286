//! The ten message envelopes exchanged between a coordinator and a
//! component, and the parameter value/type tags carried by `param_query`
//! and `param_set`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use qsi_state::{SerializedMatrix, StateEnvelope};

/// Every message carries the sender's listening port and a `msg_type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub sent_from: u16,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Envelope {
    pub fn new(sent_from: u16, body: MessageBody) -> Self {
        Self { sent_from, body }
    }
}

/// A parameter's declared type, as advertised in `param_query_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Complex,
}

/// A concrete parameter value, as sent in `param_set`. Complex values are
/// carried as a `{re, im}` pair, matching the coercion the coordinator
/// applies before sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Number(f64),
    String(String),
    Complex { re: f64, im: f64 },
}

/// One entry of a `param_set` payload: the value, wrapped in an object
/// alongside its optional declared type, matching the `{name: {value,
/// ...}}` shape components read a `value` key out of rather than a bare
/// scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSetValue {
    pub value: ParamValue,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<ParamType>,
}

impl ParamSetValue {
    pub fn new(value: ParamValue) -> Self {
        Self { value, r#type: None }
    }
}

impl From<ParamValue> for ParamSetValue {
    fn from(value: ParamValue) -> Self {
        Self::new(value)
    }
}

/// The three response shapes a component may return for a
/// `channel_query`: a usable Channel Descriptor, a refusal with a reason,
/// or a bare retrigger instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelQueryOutcome {
    Channel {
        kraus_operators: Vec<SerializedMatrix>,
        kraus_state_indices: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<f64>,
        #[serde(default)]
        retrigger: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        retrigger_time: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation_time: Option<f64>,
    },
    Refusal {
        message: String,
    },
    RetriggerOnly {
        retrigger: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        retrigger_time: Option<f64>,
    },
}

/// The body of a message envelope, tagged by `msg_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum MessageBody {
    ParamQuery,
    ParamQueryResponse {
        params: HashMap<String, ParamType>,
    },
    ParamSet {
        params: HashMap<String, ParamSetValue>,
    },
    ParamSetResponse,
    StateInit,
    StateInitResponse {
        states: Vec<StateEnvelope>,
    },
    ChannelQuery {
        #[serde(flatten)]
        state: StateEnvelope,
        ports: HashMap<String, String>,
    },
    ChannelQueryResponse {
        #[serde(flatten)]
        outcome: ChannelQueryOutcome,
    },
    Terminate,
    TerminateResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_query_round_trips() {
        let env = Envelope::new(9001, MessageBody::ParamQuery);
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"msg_type\":\"param_query\""));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.body, MessageBody::ParamQuery));
    }

    #[test]
    fn channel_query_response_refusal_round_trips() {
        let outcome = ChannelQueryOutcome::Refusal {
            message: "parameters not yet set".to_string(),
        };
        let env = Envelope::new(9002, MessageBody::ChannelQueryResponse { outcome });
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("parameters not yet set"));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        match back.body {
            MessageBody::ChannelQueryResponse { outcome } => match outcome {
                ChannelQueryOutcome::Refusal { message } => {
                    assert_eq!(message, "parameters not yet set")
                }
                other => panic!("unexpected outcome: {other:?}"),
            },
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn param_set_wraps_value_in_an_object() {
        let mut params = HashMap::new();
        params.insert(
            "reflectivity".to_string(),
            ParamSetValue::new(ParamValue::Complex { re: 0.5, im: -0.1 }),
        );
        let env = Envelope::new(9001, MessageBody::ParamSet { params });
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"reflectivity\":{\"value\":"));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        match back.body {
            MessageBody::ParamSet { params } => {
                assert_eq!(
                    params.get("reflectivity"),
                    Some(&ParamSetValue::new(ParamValue::Complex { re: 0.5, im: -0.1 }))
                );
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
