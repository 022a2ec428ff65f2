//! Wire-level failures: a frame that won't encode, decode, or name a
//! known event. Nothing here touches session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An outbound event could not be serialized.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound frame is not JSON, or its `data` does not fit the event.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame is well-formed but names an event the server does not
    /// know.
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
}
