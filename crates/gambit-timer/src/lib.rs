//! Keyed one-shot deadlines and a periodic sweep for Gambit.
//!
//! The session needs a handful of named timers (the disconnect grace
//! period, the delayed reset, one arrival debounce per new connection)
//! that are armed, re-armed and cancelled far more often than they fire.
//! [`TimerSet`] keeps them as plain deadlines in one map and exposes a
//! single future that resolves with the key of whichever fires first.
//!
//! # Integration
//!
//! Both types are designed to sit inside the session actor's
//! `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         key = timers.wait_for_next() => machine.timer_fired(key),
//!         _ = sweep.tick() => machine.sweep_idle(Instant::now()),
//!     }
//! }
//! ```
//!
//! Because a cancelled timer is simply removed from the map, a stale
//! expiry can never be delivered: there is nothing left to fire.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::trace;

// ---------------------------------------------------------------------------
// TimerSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Entry {
    deadline: Instant,
    /// Arming order, so equal deadlines fire first-armed-first.
    seq: u64,
}

/// A set of named one-shot timers.
///
/// Each key holds at most one deadline. Scheduling a key that is already
/// armed replaces its deadline (cancel-and-replace).
pub struct TimerSet<K> {
    entries: HashMap<K, Entry>,
    next_seq: u64,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K> fmt::Debug for TimerSet<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSet")
            .field("armed", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K> TimerSet<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Creates an empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `key` to fire `after` from now. Returns `true` if an earlier
    /// deadline for the same key was replaced.
    pub fn schedule(&mut self, key: K, after: Duration) -> bool {
        self.schedule_at(key, Instant::now() + after)
    }

    /// Arms `key` to fire at `deadline`. Returns `true` if an earlier
    /// deadline for the same key was replaced.
    pub fn schedule_at(&mut self, key: K, deadline: Instant) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(?key, "timer armed");
        self.entries.insert(key, Entry { deadline, seq }).is_some()
    }

    /// Disarms `key`. Returns `true` if it was armed. Safe to call for a
    /// key that was never armed.
    pub fn cancel(&mut self, key: &K) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            trace!(?key, "timer cancelled");
        }
        removed
    }

    /// Disarms every timer.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Whether `key` is currently armed.
    pub fn is_armed(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// When `key` will fire, if it is armed.
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.entries.get(key).map(|e| e.deadline)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn earliest(&self) -> Option<(K, Instant)> {
        self.entries
            .iter()
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(k, e)| (k.clone(), e.deadline))
    }

    /// Waits for the earliest armed timer, disarms it and returns its key.
    ///
    /// With nothing armed this future pends forever, which is what a
    /// `select!` branch wants. It is cancel-safe: dropping it before it
    /// resolves leaves every timer armed, and a timer armed or cancelled
    /// in the meantime is picked up by the next call.
    pub async fn wait_for_next(&mut self) -> K {
        let Some((key, deadline)) = self.earliest() else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        time::sleep_until(deadline).await;
        self.entries.remove(&key);
        trace!(?key, "timer fired");
        key
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// A fixed-period tick for housekeeping passes such as the idle sweep.
///
/// The first tick fires one full period after creation. Ticks missed
/// while the owner was busy are skipped rather than bunched up.
#[derive(Debug)]
pub struct Sweep {
    interval: Interval,
    period: Duration,
}

impl Sweep {
    /// Creates a sweep that ticks every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, period }
    }

    /// Waits for the next tick.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}
