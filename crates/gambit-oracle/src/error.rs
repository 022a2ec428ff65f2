//! Error types for the oracle layer.

/// Why the oracle refused a move or a serialized position.
///
/// Every move-related variant means the same thing to the session: the
/// move is illegal. The variants only differ in what gets logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// A square name that isn't on the board ("z9", "", "e").
    #[error("unknown square {0:?}")]
    UnknownSquare(String),

    /// The origin square is empty.
    #[error("no piece on {0}")]
    EmptySquare(String),

    /// The promotion letter isn't one of q, r, b, n.
    #[error("unknown promotion piece {0:?}")]
    BadPromotion(String),

    /// Well-formed, but against the rules in this position.
    #[error("illegal move {0}")]
    Illegal(String),

    /// A serialized position could not be parsed.
    #[error("invalid position: {0}")]
    InvalidPosition(String),
}
