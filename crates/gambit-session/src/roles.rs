//! Seat assignment policy.

use gambit_protocol::{Color, ConnectionId, Role};

use crate::SessionState;

/// Decides which role a connection gets.
///
/// The assigner only decides; the [`SessionMachine`](crate::SessionMachine)
/// applies the decision (seating the connection, clearing the pending
/// reconnect, notifying everyone).
///
/// # Policy (first match wins)
///
/// 1. The White seat is being held for this identity → White.
/// 2. The Black seat is being held for this identity → Black.
/// 3. White is available → White; else Black is available → Black.
/// 4. Otherwise → Spectator.
///
/// A seat is *available* only when it is empty and not held for anyone,
/// so a stranger arriving during a grace period never takes the seat of
/// the player who dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAssigner;

impl RoleAssigner {
    /// The seat being held for `conn`, if any.
    pub fn held_seat<P>(state: &SessionState<P>, conn: &ConnectionId) -> Option<Color> {
        state.pending_reconnect.color_of(conn)
    }

    /// The first available seat, White first.
    pub fn open_seat<P>(state: &SessionState<P>) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&c| state.seat_available(c))
    }

    /// Applies the full policy to an arriving connection.
    pub fn assign<P>(state: &SessionState<P>, conn: &ConnectionId) -> Role {
        Self::held_seat(state, conn)
            .or_else(|| Self::open_seat(state))
            .map_or(Role::Spectator, Role::from)
    }

    /// Whether an explicit `reconnectPlayer` request for `color`,
    /// presenting `old_id`, may be granted: the seat is available, or it
    /// is being held for exactly `old_id`.
    pub fn can_claim<P>(state: &SessionState<P>, color: Color, old_id: &ConnectionId) -> bool {
        state.seat_available(color) || state.pending_reconnect.get(color) == Some(old_id)
    }
}
