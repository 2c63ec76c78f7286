//! A minimal runtime shared by the example component binaries: accept the
//! coordinator's connection, then dispatch each inbound message by its
//! `msg_type` tag until `terminate` is received or the socket closes.

use std::net::TcpListener;

use qsi_transport::{recv_envelope, send_envelope, Envelope, MessageBody};
use tracing::{info, warn};

/// Every example component's CLI surface: its own listening port, then
/// the coordinator's listening port.
#[derive(clap::Parser, Debug)]
pub struct ComponentArgs {
    pub own_port: u16,
    pub coordinator_port: u16,
}

/// Bind `own_port`, accept the coordinator's single connection, and
/// dispatch each message to `handler` until `terminate`.
///
/// `handler` is the tagged-variant dispatch table: a plain match over
/// `MessageBody` variants, the idiomatic replacement for a runtime
/// registry of named handlers.
pub fn run_component(
    own_port: u16,
    mut handler: impl FnMut(MessageBody) -> MessageBody,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", own_port))?;
    info!(port = own_port, "component listening");
    let (mut stream, _) = listener.accept()?;

    loop {
        let envelope = match recv_envelope(&mut stream) {
            Ok(env) => env,
            Err(e) => {
                warn!("dropping connection after malformed/closed read: {e}");
                break;
            }
        };

        let terminating = matches!(envelope.body, MessageBody::Terminate);
        let response_body = if terminating {
            MessageBody::TerminateResponse
        } else {
            handler(envelope.body)
        };

        send_envelope(&mut stream, &Envelope::new(own_port, response_body))?;

        if terminating {
            info!("received terminate, exiting");
            break;
        }
    }
    Ok(())
}
