use wireroom_protocol::ProtocolError;

/// Errors from the peer client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The WebSocket handshake failed.
    #[error("connect failed: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    /// Building or encoding an envelope failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
