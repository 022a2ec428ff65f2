//! Disconnect/reconnect reconciliation.
//!
//! Tracks whether a vacated seat is being held and for how long. The
//! reconciler is a pure state holder: the machine asks it what phase the
//! hold is in and tells it what happened, then performs the effects
//! (notifications, timers) itself.

use std::time::{Duration, Instant};

use gambit_protocol::Color;

/// The reconciler's state.
///
/// ```text
///   Idle ──(seat vacated)──→ GracePeriod ──(deadline)──→ Expiring
///    ↑                           │                          │
///    └──────(all reclaimed)──────┘                          │
///    └───────────────────────(reset)────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// No seat is being held.
    Idle,
    /// A seat is held until `deadline`. If both players dropped, `color`
    /// is the one that dropped last (whose disconnect armed the timer).
    GracePeriod { color: Color, deadline: Instant },
    /// The hold ran out for `color`; a reset is scheduled.
    Expiring { color: Color },
}

/// Holds the reconciliation state for the session.
#[derive(Debug, Clone)]
pub struct DisconnectReconciler {
    state: ReconcileState,
}

impl Default for DisconnectReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl DisconnectReconciler {
    pub fn new() -> Self {
        Self {
            state: ReconcileState::Idle,
        }
    }

    /// The current state.
    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Whether a reset is already on its way.
    pub fn is_expiring(&self) -> bool {
        matches!(self.state, ReconcileState::Expiring { .. })
    }

    /// A seated player dropped. Starts (or restarts) the hold. The latest
    /// disconnect always wins: its deadline replaces any earlier one.
    pub fn seat_vacated(&mut self, color: Color, now: Instant, grace: Duration) {
        self.state = ReconcileState::GracePeriod {
            color,
            deadline: now + grace,
        };
    }

    /// A held seat was reclaimed. `still_held` is the color whose seat is
    /// still being held, if any.
    ///
    /// Returns `true` when nothing is held any more and the grace timer
    /// should be cancelled.
    pub fn seat_reclaimed(&mut self, still_held: Option<Color>) -> bool {
        let ReconcileState::GracePeriod { deadline, .. } = self.state else {
            return false;
        };
        match still_held {
            Some(color) => {
                self.state = ReconcileState::GracePeriod { color, deadline };
                false
            }
            None => {
                self.state = ReconcileState::Idle;
                true
            }
        }
    }

    /// The grace timer fired. Returns the color that ran out of time, or
    /// `None` if no hold was active (a stale expiry).
    pub fn grace_expired(&mut self) -> Option<Color> {
        let ReconcileState::GracePeriod { color, .. } = self.state else {
            return None;
        };
        self.state = ReconcileState::Expiring { color };
        Some(color)
    }

    /// Back to `Idle`, whatever the state.
    pub fn reset(&mut self) {
        self.state = ReconcileState::Idle;
    }
}
