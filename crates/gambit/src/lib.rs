//! # Gambit
//!
//! A single-session chess server. Two players, any number of spectators,
//! one board.
//!
//! Gambit ties the layers together: the WebSocket transport accepts
//! connections, the protocol codec turns frames into events, and one
//! session actor runs the [`SessionMachine`](gambit_session::SessionMachine)
//! that decides what every event means.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gambit::prelude::*;
//!
//! # async fn run() -> Result<(), GambitError> {
//! let server = GambitServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build(ChessOracle::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod actor;
mod error;
mod handler;
mod outbound;
mod server;

pub use actor::{SessionHandle, SessionSnapshot, spawn_session};
pub use error::GambitError;
pub use outbound::{ChannelBroadcaster, EventSender};
pub use server::{GambitServer, GambitServerBuilder};

/// Everything needed to run a server.
pub mod prelude {
    pub use crate::{GambitError, GambitServer, GambitServerBuilder, SessionHandle};
    pub use gambit_oracle::{ChessOracle, GameOracle, Outcome};
    pub use gambit_protocol::{ClientEvent, Color, ConnectionId, MoveSpec, ServerEvent};
    pub use gambit_session::{Phase, SessionConfig};
}
