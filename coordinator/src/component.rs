//! A running component process and the connection the facade speaks to
//! it over.

use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use qsi_transport::{recv_envelope, send_envelope, Envelope, MessageBody};
use tracing::{info, warn};

use crate::error::{CoordinatorError, Result};

/// How many times to retry an initial connection to a freshly-spawned
/// component, and how long to wait between attempts.
const CONNECT_RETRY_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// How long to wait for a component to exit gracefully after `terminate`
/// before killing it outright.
const TERMINATE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Whether a component has received its parameters yet. Replaces the
/// module-global mutable parameter storage of the example device
/// implementations with state owned per component handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamState {
    Unset,
    Ready,
}

/// A spawned component process, the socket connection to it, and its
/// parameter lifecycle state.
pub struct ComponentHandle {
    id: String,
    own_port: u16,
    child: Child,
    stream: TcpStream,
    param_state: ParamState,
    query_in_flight: bool,
    stdout_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<()>>,
}

impl ComponentHandle {
    /// Spawn `component` with its own listening port and the
    /// coordinator's listening port as positional arguments, then connect
    /// to it as a client, retrying with linear backoff if the connection
    /// is initially refused.
    pub fn spawn(
        id: impl Into<String>,
        component: &Path,
        own_port: u16,
        coordinator_port: u16,
    ) -> Result<Self> {
        let id = id.into();
        let mut child = Command::new(component)
            .arg(own_port.to_string())
            .arg(coordinator_port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoordinatorError::SpawnFailed(e.to_string()))?;

        let stdout_thread = child.stdout.take().map(|out| {
            let id = id.clone();
            thread::spawn(move || {
                for line in BufReader::new(out).lines().map_while(std::result::Result::ok) {
                    info!(component = %id, "{line}");
                }
            })
        });
        let stderr_thread = child.stderr.take().map(|err| {
            let id = id.clone();
            thread::spawn(move || {
                for line in BufReader::new(err).lines().map_while(std::result::Result::ok) {
                    warn!(component = %id, "{line}");
                }
            })
        });

        let stream = Self::retry_connection(own_port)?;

        info!(component = %id, port = own_port, "component registered");
        Ok(Self {
            id,
            own_port,
            child,
            stream,
            param_state: ParamState::Unset,
            query_in_flight: false,
            stdout_thread,
            stderr_thread,
        })
    }

    fn retry_connection(port: u16) -> Result<TcpStream> {
        let mut last_err = None;
        for attempt in 0..CONNECT_RETRY_ATTEMPTS {
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    warn!(port, attempt, "connection refused, retrying: {e}");
                    last_err = Some(e);
                    thread::sleep(CONNECT_RETRY_DELAY);
                }
            }
        }
        let _ = last_err;
        Err(CoordinatorError::Transport(
            qsi_transport::TransportError::ConnectionRefused {
                attempts: CONNECT_RETRY_ATTEMPTS,
            },
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn port(&self) -> u16 {
        self.own_port
    }

    pub fn param_state(&self) -> ParamState {
        self.param_state
    }

    /// Send a message and block for the single reply, enforcing that at
    /// most one query may be outstanding per handle.
    pub fn request(&mut self, sent_from: u16, body: MessageBody) -> Result<Envelope> {
        if self.query_in_flight {
            return Err(CoordinatorError::QueryInFlight(self.id.clone()));
        }
        self.query_in_flight = true;
        let result = (|| {
            send_envelope(&mut self.stream, &Envelope::new(sent_from, body))?;
            Ok(recv_envelope(&mut self.stream)?)
        })();
        self.query_in_flight = false;
        result
    }

    /// Record that `param_set` has been acknowledged.
    pub fn mark_ready(&mut self) {
        self.param_state = ParamState::Ready;
    }

    /// Send `terminate`, wait up to [`TERMINATE_GRACE_PERIOD`] for the
    /// process to exit, then kill it.
    pub fn terminate(mut self) -> Result<()> {
        let _ = self.request(self.own_port, MessageBody::Terminate);

        let deadline = std::time::Instant::now() + TERMINATE_GRACE_PERIOD;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if std::time::Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(100));
                }
                _ => {
                    warn!(component = %self.id, "component did not exit gracefully, killing");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        if let Some(t) = self.stdout_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.stderr_thread.take() {
            let _ = t.join();
        }
        info!(component = %self.id, "component terminated");
        Ok(())
    }
}
