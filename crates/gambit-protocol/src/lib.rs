//! Wire protocol for Gambit.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Color`], [`MoveSpec`],
//!   etc.): the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Wire shape
//!
//! Every frame is one event, adjacently tagged:
//!
//! ```text
//! { "event": "move", "data": { "from": "e2", "to": "e4", "promotion": "q" } }
//! { "event": "gameStarted" }
//! ```
//!
//! The protocol layer doesn't know about seats, turns or timers. It only
//! knows how to serialize and deserialize events.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, Color, MovePayload, MoveSpec, RawEvent, Role, ServerEvent,
};

pub use gambit_transport::ConnectionId;
