//! Error types for the session layer.

use gambit_oracle::OracleError;
use gambit_protocol::ConnectionId;

/// Why a submitted move was not played.
///
/// Only [`IllegalMove`](Self::IllegalMove) and
/// [`MalformedMovePayload`](Self::MalformedMovePayload) are reported to
/// the client (as `invalidMove`). The rest are dropped silently: the
/// client's own UI should never have let them through.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// The rules don't allow this move here.
    #[error("illegal move: {0}")]
    IllegalMove(#[from] OracleError),

    /// The submitter doesn't hold the seat whose turn it is.
    #[error("not your turn")]
    NotYourTurn,

    /// Both seats aren't filled, or the game is paused.
    #[error("game has not started")]
    GameNotStarted,

    /// The game is over and waiting for its reset.
    #[error("game is already over")]
    GameFinished,

    /// The payload wasn't a move at all.
    #[error("malformed move payload")]
    MalformedMovePayload,
}

impl MoveError {
    /// Whether the submitter is told about this rejection.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::IllegalMove(_) | Self::MalformedMovePayload)
    }
}

/// Errors from session operations other than moves.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A live connection already goes by this identity.
    #[error("identity {0} is already connected")]
    IdentityInUse(ConnectionId),

    /// The connection isn't known to the session.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The session actor has stopped.
    #[error("session is unavailable")]
    Unavailable,
}
