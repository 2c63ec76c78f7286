//! OS-assigned ephemeral port helpers, used when a caller registers a
//! component without pinning a fixed port.

use std::net::{SocketAddr, TcpListener};

/// Ask the OS for a free port by binding to port 0 and immediately
/// releasing the listener.
pub fn find_empty_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Whether `port` is currently free to bind on localhost.
pub fn is_port_open(port: u16) -> bool {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    TcpListener::bind(addr).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_empty_port_returns_a_bindable_port() {
        let port = find_empty_port().unwrap();
        assert!(is_port_open(port));
    }
}
