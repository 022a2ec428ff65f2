//! Turning [`ServerEvent`](crate::ServerEvent)s into frames and frames
//! into [`ClientEvent`](crate::ClientEvent)s.
//!
//! The connection handler only sees the [`Codec`] trait, never `serde_json`.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Frame encoding shared by every connection task for the server's
/// lifetime, hence `Send + Sync + 'static`.
pub trait Codec: Send + Sync + 'static {
    /// Encodes an outbound event.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] when the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes an inbound frame as `T`.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] when the frame isn't valid for `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON frames, `{"event": ..., "data": ...}`. Browsers parse these
/// natively, so it is the only codec the server ships with.
///
/// ```rust
/// use gambit_protocol::{ClientEvent, Codec, JsonCodec, MoveSpec};
///
/// let frame = br#"{"event":"move","data":{"from":"e2","to":"e4"}}"#;
/// let event: ClientEvent = JsonCodec.decode(frame).unwrap();
/// assert_eq!(event, ClientEvent::Move(MoveSpec::new("e2", "e4")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
