//! Skips network tests where the sandbox forbids binding local sockets.

use std::net::TcpListener;

use wiremock::MockServer;

/// Returns true if a loopback socket can be bound.
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Starts a mock server, or returns `None` (with a note on stderr) when
/// loopback sockets are unavailable.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if !can_bind_localhost() {
        eprintln!("skipping: cannot bind a loopback socket in this environment");
        return None;
    }
    Some(MockServer::start().await)
}
