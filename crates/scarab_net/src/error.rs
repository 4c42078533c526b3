//! Network-layer error types (spec §7, `TransportFault` and friends).

/// Errors that can occur in the control server or event logger.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to bind the control server's listening socket.
    #[error("failed to bind control server on {0}: {1}")]
    Bind(std::net::SocketAddr, std::io::Error),

    /// Failed to serialize an event to its wire form.
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The WebSocket handshake with a connecting client failed.
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}
