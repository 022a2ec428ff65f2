//! The rule-engine seam for Gambit.
//!
//! The session core never knows which game it is running. It asks a
//! [`GameOracle`] whose turn it is, whether a move is legal, and whether
//! the game is over, and treats the position as an opaque value it stores
//! and hands back.
//!
//! # Key types
//!
//! - [`GameOracle`]: the trait a rule engine implements
//! - [`Outcome`]: how a game ended, in tie-break order
//! - [`ChessOracle`]: chess rules on top of the `chess` crate
//!   (feature `chess`, on by default)

mod error;
mod oracle;
mod outcome;

#[cfg(feature = "chess")]
mod chess_rules;

#[cfg(feature = "chess")]
pub use chess_rules::{ChessOracle, ChessPosition};
pub use error::OracleError;
pub use oracle::GameOracle;
pub use outcome::Outcome;
