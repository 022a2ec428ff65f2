//! The deferred-work seam.

use std::time::Duration;

use gambit_protocol::ConnectionId;
use gambit_timer::TimerSet;

/// Names of the session's timers. At most one of each is armed at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// A seated player disconnected; their seat is held until this fires.
    Grace,
    /// The session resets when this fires (after game over or expiry).
    Reset,
    /// A new connection is assigned a role when this fires.
    Arrival(ConnectionId),
}

/// Arms and disarms the session's timers.
///
/// Implementations deliver an armed key back to
/// [`SessionMachine::timer_fired`](crate::SessionMachine::timer_fired)
/// once its delay has passed, unless it was cancelled or re-armed first.
pub trait Scheduler {
    /// Arms `key` to fire after `after`, replacing any earlier deadline.
    fn schedule(&mut self, key: TimerKey, after: Duration);

    /// Disarms `key`. A no-op if it isn't armed.
    fn cancel(&mut self, key: &TimerKey);

    /// Disarms every timer.
    fn cancel_all(&mut self);
}

impl Scheduler for TimerSet<TimerKey> {
    fn schedule(&mut self, key: TimerKey, after: Duration) {
        TimerSet::schedule(self, key, after);
    }

    fn cancel(&mut self, key: &TimerKey) {
        TimerSet::cancel(self, key);
    }

    fn cancel_all(&mut self) {
        TimerSet::cancel_all(self);
    }
}
