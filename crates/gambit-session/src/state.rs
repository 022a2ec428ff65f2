//! The session's data: one [`SessionState`] per process.

use std::time::Instant;

use gambit_oracle::Outcome;
use gambit_protocol::{Color, ConnectionId, Role, ServerEvent};

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// One optional value per color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seats<T> {
    pub white: Option<T>,
    pub black: Option<T>,
}

impl<T> Default for Seats<T> {
    fn default() -> Self {
        Self {
            white: None,
            black: None,
        }
    }
}

impl<T> Seats<T> {
    /// The value for `color`.
    pub fn get(&self, color: Color) -> Option<&T> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    /// Mutable access to the slot for `color`.
    pub fn slot(&mut self, color: Color) -> &mut Option<T> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Stores `value` for `color`, returning what was there.
    pub fn set(&mut self, color: Color, value: T) -> Option<T> {
        self.slot(color).replace(value)
    }

    /// Empties the slot for `color`, returning what was there.
    pub fn take(&mut self, color: Color) -> Option<T> {
        self.slot(color).take()
    }

    /// Whether both slots hold a value.
    pub fn both(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    /// Whether neither slot holds a value.
    pub fn is_empty(&self) -> bool {
        self.white.is_none() && self.black.is_none()
    }
}

impl<T: PartialEq> Seats<T> {
    /// The color whose slot holds `value`, White checked first.
    pub fn color_of(&self, value: &T) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&c| self.get(c) == Some(value))
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///   WaitingForPlayers ──(both seated)──→ InProgress ──(outcome)──→ GameOver
///          ↑                                │                        │
///          │                          (seat vacated)                 │
///          │                                ▼                        │
///          └──────────────(reset)───── WaitingForPlayers ←──(reset)──┘
/// ```
///
/// Derived from [`SessionState`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// At least one seat is empty, or the game is paused by a disconnect.
    WaitingForPlayers,
    /// Both seats are filled and moves are accepted.
    InProgress,
    /// The oracle reported an outcome; a reset is scheduled.
    GameOver,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything the session knows about the game in progress.
///
/// Mutated only by the [`SessionMachine`](crate::SessionMachine). The
/// invariants it maintains:
///
/// - an identity occupies at most one of {white seat, black seat,
///   spectators}
/// - `started` implies both seats are filled
/// - a pending reconnect for a color implies that seat is empty and the
///   grace timer is armed
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState<P> {
    /// The oracle's position. Opaque here.
    pub position: P,
    /// Who holds each seat.
    pub seats: Seats<ConnectionId>,
    /// Display names of the current seat holders.
    pub display_names: Seats<String>,
    /// The identity each vacated seat is being held for.
    pub pending_reconnect: Seats<ConnectionId>,
    /// Watching connections, in arrival order.
    pub spectators: Vec<ConnectionId>,
    /// Moves are accepted only while this is set.
    pub started: bool,
    /// A started game was interrupted by a seated disconnect.
    pub suspended: bool,
    /// How the game ended, once it has.
    pub outcome: Option<Outcome>,
    /// Last accepted move, or the moment the game started.
    pub last_activity: Instant,
}

impl<P> SessionState<P> {
    /// A fresh session: empty seats, no spectators, not started.
    pub fn new(position: P, now: Instant) -> Self {
        Self {
            position,
            seats: Seats::default(),
            display_names: Seats::default(),
            pending_reconnect: Seats::default(),
            spectators: Vec::new(),
            started: false,
            suspended: false,
            outcome: None,
            last_activity: now,
        }
    }

    /// The role `conn` currently holds, if any.
    pub fn role_of(&self, conn: &ConnectionId) -> Option<Role> {
        if let Some(color) = self.seats.color_of(conn) {
            Some(Role::from(color))
        } else if self.spectators.contains(conn) {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    /// Whether a new arrival may take `color`: the seat is empty and not
    /// being held for a disconnected player.
    pub fn seat_available(&self, color: Color) -> bool {
        self.seats.get(color).is_none() && self.pending_reconnect.get(color).is_none()
    }

    /// The derived lifecycle phase.
    pub fn phase(&self) -> Phase {
        if self.outcome.is_some() {
            Phase::GameOver
        } else if self.started {
            Phase::InProgress
        } else {
            Phase::WaitingForPlayers
        }
    }

    /// The `playersInfo` event for the current seats.
    pub fn players_info(&self) -> ServerEvent {
        ServerEvent::PlayersInfo {
            white: self.display_names.white.clone(),
            black: self.display_names.black.clone(),
            started: self.started,
        }
    }
}
