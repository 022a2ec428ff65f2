//! How a game ended.

use std::fmt;

use gambit_protocol::Color;

/// A terminal game result.
///
/// Variants are declared in tie-break order: when a position satisfies
/// several conditions at once (a mate delivered on the hundredth quiet
/// half-move, say), the earliest variant is the one reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The side to move is in check with no legal reply.
    Checkmate {
        /// The side that delivered mate.
        winner: Color,
    },
    /// The side to move has no legal move but is not in check.
    Stalemate,
    /// The same position has occurred for the third time.
    ThreefoldRepetition,
    /// Neither side has enough material left to mate.
    InsufficientMaterial,
    /// A hundred half-moves without a capture or a pawn move.
    FiftyMoveRule,
}

impl Outcome {
    /// The winning side, or `None` for a draw.
    pub fn winner(&self) -> Option<Color> {
        match self {
            Self::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }

    /// `true` for every outcome except checkmate.
    pub fn is_draw(&self) -> bool {
        self.winner().is_none()
    }

    /// The human-readable result carried by `gameOver`.
    pub fn message(&self) -> String {
        match self {
            Self::Checkmate { winner } => format!("Checkmate! {} wins!", winner.name()),
            Self::Stalemate => "Stalemate! The game is a draw.".to_owned(),
            Self::ThreefoldRepetition => "Draw by threefold repetition!".to_owned(),
            Self::InsufficientMaterial => "Draw by insufficient material!".to_owned(),
            Self::FiftyMoveRule => "Draw by the fifty-move rule!".to_owned(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
