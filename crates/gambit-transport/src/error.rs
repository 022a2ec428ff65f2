/// Errors raised while accepting or talking to a WebSocket peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The upgrade request was rejected or malformed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    /// A frame could not be written. The peer is most likely gone.
    #[error("send to peer failed: {0}")]
    Send(String),

    /// The socket broke while waiting for a frame.
    #[error("receive from peer failed: {0}")]
    Receive(String),
}
