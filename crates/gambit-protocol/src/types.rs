//! Core protocol types for Gambit's wire format.
//!
//! Every type in this module travels "on the wire": it is serialized to
//! JSON, sent over the WebSocket, and deserialized by the browser client
//! (or by the server, for inbound events).
//!
//! Event and field names are camelCase because the client is JavaScript.

use std::fmt;

use gambit_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color / Role
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
///
/// Serialized as `"w"` / `"b"`, the same letters FEN uses for the side to
/// move, so the client can compare its role with the board's turn directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Color {
    /// Both colors, White first. Seat assignment walks this order.
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// The other seat.
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Human-readable name, capitalized ("White", "Black").
    pub fn name(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a connection is allowed to do in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Holds the white seat.
    White,
    /// Holds the black seat.
    Black,
    /// Watches only. Moves from spectators are never accepted.
    Spectator,
}

impl Role {
    /// Returns the seat color, or `None` for spectators.
    pub fn color(self) -> Option<Color> {
        match self {
            Self::White => Some(Color::White),
            Self::Black => Some(Color::Black),
            Self::Spectator => None,
        }
    }
}

impl From<Color> for Role {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => f.write_str("White"),
            Self::Black => f.write_str("Black"),
            Self::Spectator => f.write_str("Spectator"),
        }
    }
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// A move as the client submits it: origin and target squares in
/// algebraic notation, plus an optional promotion piece letter.
///
/// Nothing here is validated. `"z9"` is a perfectly good `MoveSpec`; the
/// oracle is what decides it is illegal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl MoveSpec {
    /// A move without a promotion piece.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    /// Sets the promotion piece letter (`"q"`, `"r"`, `"b"`, `"n"`).
    pub fn with_promotion(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }
}

impl fmt::Display for MoveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = &self.promotion {
            write!(f, "={p}")?;
        }
        Ok(())
    }
}

/// The payload echoed back in `invalidMove`.
///
/// A well-formed but illegal move is echoed as the parsed [`MoveSpec`]. A
/// payload that didn't even parse is echoed verbatim, so the client sees
/// exactly what it sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MovePayload {
    Parsed(MoveSpec),
    Raw(serde_json::Value),
}

impl From<MoveSpec> for MovePayload {
    fn from(spec: MoveSpec) -> Self {
        Self::Parsed(spec)
    }
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// Disconnects have no event: closing the socket is the disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// "I'd like to make this move."
    Move(MoveSpec),

    /// "I held this seat as `old_connection_id`; give it back."
    ReconnectPlayer {
        role: Color,
        #[serde(rename = "oldConnectionId")]
        old_connection_id: ConnectionId,
    },

    /// "Start over." Honored from anyone, spectators included.
    RequestRematch,
}

/// The minimal shape every inbound frame has, whatever its event.
///
/// Used as a fallback when a frame fails to decode as a [`ClientEvent`]:
/// if the tag still says `move`, the payload is malformed rather than the
/// frame, and the sender deserves an `invalidMove` instead of silence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Events the server sends to one connection or broadcasts to all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// First frame on every connection: the identity to present when
    /// reconnecting.
    Connected {
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
    },

    /// "You hold this seat."
    PlayerRole(Color),

    /// "Both seats are taken; you are watching."
    SpectatorRole,

    /// Free-form note for spectators.
    SpectatorMessage(String),

    /// Sent to a seated player whose opponent seat is still empty.
    WaitingForOpponent(String),

    /// The serialized position (FEN for chess).
    BoardState(String),

    /// Both seats are filled and play begins.
    GameStarted,

    /// An accepted move, exactly as it was submitted.
    Move(MoveSpec),

    /// The submitter's move was rejected by the rules.
    InvalidMove(MovePayload),

    /// The game ended; the text names the outcome.
    GameOver(String),

    /// Sent to the remaining player when their opponent drops.
    OpponentDisconnected { message: String, color: Color },

    /// Sent to the remaining player when their opponent comes back.
    OpponentReconnected(String),

    /// Broadcast when a paused game resumes after a reconnection.
    GameResumed(String),

    /// The grace period ran out; the session resets shortly.
    PlayerLeft { message: String, color: Color },

    /// The session went back to its initial state.
    GameReset,

    /// Who is seated, and whether play is under way.
    PlayersInfo {
        white: Option<String>,
        black: Option<String>,
        started: bool,
    },

    /// The connection was refused or a request could not be honored.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
