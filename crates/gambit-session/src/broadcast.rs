//! The outbound seam.

use gambit_protocol::{ConnectionId, ServerEvent};

/// Delivers server events to connections.
///
/// Delivery is fire-and-forget: an event for a connection that has
/// already gone away is dropped. Events sent to the same connection must
/// arrive in the order they were sent, which is what guarantees every
/// client sees `move` before the `boardState` that follows it.
pub trait Broadcaster {
    /// Sends `event` to one connection.
    fn send_to(&mut self, conn: &ConnectionId, event: ServerEvent);

    /// Sends `event` to every live connection.
    fn broadcast(&mut self, event: ServerEvent);
}
