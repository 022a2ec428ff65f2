//! Transport abstraction layer for Gambit.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol, plus the [`ConnectionId`] identity every layer
//! above uses to tell peers apart.
//!
//! # Identity
//!
//! A connection's identity is a string, not a socket number. A client that
//! lost its socket can open a new one and present the identity it was
//! given before (`?id=<identity>` on the upgrade URI). The session layer
//! matches that identity against seats held for disconnected players, so
//! identity has to survive the socket.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod query;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use query::PeerInfo;
#[cfg(feature = "websocket")]
pub use websocket::{HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Longest identity a client may present. Anything longer is ignored and a
/// fresh identity is generated instead.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Identity of a connection, stable across reconnects.
///
/// Serialized as a plain JSON string so clients can echo it back in a
/// `reconnectPlayer` request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 32-character hex identity (128 bits of entropy).
    ///
    /// Guessing someone else's identity is what it would take to steal a
    /// seat held for them during a grace period, so this has to be
    /// unguessable, not just unique.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns `true` if `candidate` is acceptable as a client-chosen
    /// identity: non-empty, at most [`MAX_IDENTITY_LEN`] bytes, and made of
    /// ASCII alphanumerics, `-` and `_` only.
    pub fn is_valid(candidate: &str) -> bool {
        !candidate.is_empty()
            && candidate.len() <= MAX_IDENTITY_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting happens in two steps. [`accept`](Self::accept) only takes the
/// next raw connection off the listener; [`Incoming::establish`] runs the
/// protocol handshake. The server runs the second step on the connection's
/// own task, so a peer that stalls its handshake holds up nobody else.
pub trait Transport: Send + Sync + 'static {
    /// A connection taken off the listener, not yet handshaken.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;
}

/// A raw connection whose handshake hasn't run yet.
pub trait Incoming: Send + 'static {
    /// The connection the handshake produces.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake and yields the established connection.
    async fn establish(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// the server runs one reader and one writer per connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identity this connection is known by.
    fn id(&self) -> &ConnectionId;

    /// Returns the display name the client asked for, if any.
    fn display_name(&self) -> Option<&str>;
}
