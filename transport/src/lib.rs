//! Length-prefixed, schema-validated message envelopes exchanged between a
//! coordinator and the component processes it drives.
//!
//! This layer is explicitly out of core-engine scope: it does not know how
//! to apply a channel, only how to carry one over a socket. See
//! [`qsi_state`] for the engine itself.

pub mod error;
pub mod framing;
pub mod message;

pub use error::{Result, TransportError};
pub use framing::{read_frame, write_frame};
pub use message::{ChannelQueryOutcome, Envelope, MessageBody, ParamSetValue, ParamType, ParamValue};

use std::io::{Read, Write};

use tracing::warn;

/// Send an [`Envelope`] as one length-prefixed JSON frame.
pub fn send_envelope<W: Write>(stream: &mut W, envelope: &Envelope) -> Result<()> {
    let payload = serde_json::to_vec(envelope)
        .map_err(|e| TransportError::MalformedMessage(e.to_string()))?;
    write_frame(stream, &payload)
}

/// Receive one length-prefixed JSON frame and parse it as an [`Envelope`].
/// A schema/parse failure is logged and reported as
/// [`TransportError::MalformedMessage`]; per the lifecycle error policy
/// the caller is expected to drop the message rather than treat it as
/// fatal.
pub fn recv_envelope<R: Read>(stream: &mut R) -> Result<Envelope> {
    let payload = read_frame(stream)?;
    serde_json::from_slice(&payload).map_err(|e| {
        warn!("dropping inbound message that failed schema validation: {e}");
        TransportError::MalformedMessage(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn envelope_round_trips_over_a_framed_stream() {
        let env = Envelope::new(9001, MessageBody::ParamQuery);
        let mut buf = Vec::new();
        send_envelope(&mut buf, &env).unwrap();

        let mut cursor = Cursor::new(buf);
        let back = recv_envelope(&mut cursor).unwrap();
        assert_eq!(back.sent_from, 9001);
        assert!(matches!(back.body, MessageBody::ParamQuery));
    }

    #[test]
    fn malformed_payload_is_reported_not_panicked() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"not json").unwrap();
        let mut cursor = Cursor::new(buf);
        assert!(recv_envelope(&mut cursor).is_err());
    }
}
