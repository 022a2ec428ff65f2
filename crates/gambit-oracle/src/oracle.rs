//! The `GameOracle` trait: the seam between session logic and game rules.

use std::fmt;

use gambit_protocol::{Color, MoveSpec};

use crate::{OracleError, Outcome};

/// A rule engine for a two-player, turn-based game.
///
/// The oracle is stateless: all game state lives in [`Self::Position`],
/// which the session owns and passes back on every call. That keeps the
/// session's reset trivial (replace the position with
/// [`start_position`](Self::start_position)) and lets tests swap in a
/// scripted oracle.
///
/// `Send + 'static` because the session actor that owns the oracle runs
/// as a spawned Tokio task.
pub trait GameOracle: Send + 'static {
    /// The full game position. Opaque to everything but the oracle.
    type Position: Clone + fmt::Debug + PartialEq + Send;

    /// The position every game starts from.
    fn start_position(&self) -> Self::Position;

    /// Whose move it is.
    fn current_turn(&self, position: &Self::Position) -> Color;

    /// Plays `mv` for the side to move.
    ///
    /// On `Err` the position must be left exactly as it was.
    fn apply_move(
        &self,
        position: &mut Self::Position,
        mv: &MoveSpec,
    ) -> Result<(), OracleError>;

    /// How the game ended, or `None` while it is still going.
    ///
    /// When several terminal conditions hold at once, implementations
    /// report the first in [`Outcome`]'s declared order.
    fn outcome(&self, position: &Self::Position) -> Option<Outcome>;

    /// `true` once [`outcome`](Self::outcome) is `Some`.
    fn is_game_over(&self, position: &Self::Position) -> bool {
        self.outcome(position).is_some()
    }

    /// Serializes the position for clients (`boardState`).
    fn serialize(&self, position: &Self::Position) -> String;

    /// Parses a position produced by [`serialize`](Self::serialize).
    fn deserialize(&self, data: &str) -> Result<Self::Position, OracleError>;
}
