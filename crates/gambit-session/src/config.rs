//! Session timing configuration.

use std::time::Duration;

/// Every delay the session uses.
///
/// `Default` gives the production values; tests shrink them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a disconnected player's seat is held for them.
    ///
    /// Default: 20 seconds.
    pub grace_period: Duration,

    /// Delay between `gameOver` and the automatic reset.
    ///
    /// Default: 5 seconds.
    pub game_over_reset_delay: Duration,

    /// Delay between `playerLeft` (grace period ran out) and the reset.
    ///
    /// Default: 2 seconds.
    pub expiry_reset_delay: Duration,

    /// A started game with no accepted move for this long is abandoned.
    ///
    /// Default: 30 minutes.
    pub idle_timeout: Duration,

    /// How often the idle check runs.
    ///
    /// Default: 60 seconds.
    pub idle_sweep_interval: Duration,

    /// How long a new connection waits before it is given a role.
    ///
    /// The wait gives a reconnecting client time to claim its old seat
    /// explicitly before the ordinary arrival path hands it a fresh one.
    ///
    /// Default: 100 milliseconds.
    pub arrival_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(20),
            game_over_reset_delay: Duration::from_secs(5),
            expiry_reset_delay: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(30 * 60),
            idle_sweep_interval: Duration::from_secs(60),
            arrival_debounce: Duration::from_millis(100),
        }
    }
}
