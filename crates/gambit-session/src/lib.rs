//! The session core for Gambit.
//!
//! One process hosts one game. This crate owns everything that decides
//! what happens in it:
//!
//! 1. **Seats**: who plays White, who plays Black, who watches
//!    ([`RoleAssigner`])
//! 2. **Disconnects**: holding a seat open for a grace period and
//!    giving it back on reconnection ([`DisconnectReconciler`])
//! 3. **Lifecycle**: start, turn gating, game over, reset
//!    ([`SessionMachine`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)         ← runs the machine in an actor, feeds it events
//!     ↕
//! Session (this crate)   ← decides; talks out through Broadcaster/Scheduler
//!     ↕
//! Oracle + Protocol      ← game rules, wire events
//! ```
//!
//! The machine never touches a socket or a clock. Outbound events go
//! through a [`Broadcaster`], deferred work through a [`Scheduler`], and
//! the current time is passed in. That keeps every transition a plain,
//! synchronous, testable function call.

mod broadcast;
mod config;
mod error;
mod machine;
mod reconcile;
mod roles;
mod schedule;
mod state;

pub use broadcast::Broadcaster;
pub use config::SessionConfig;
pub use error::{MoveError, SessionError};
pub use machine::SessionMachine;
pub use reconcile::{DisconnectReconciler, ReconcileState};
pub use roles::RoleAssigner;
pub use schedule::{Scheduler, TimerKey};
pub use state::{Phase, Seats, SessionState};
