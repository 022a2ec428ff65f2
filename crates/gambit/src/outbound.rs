//! Channel-backed [`Broadcaster`]: one unbounded queue per connection.
//!
//! The session actor never writes to a socket. It pushes events onto each
//! connection's queue and that connection's writer task drains it, so a
//! slow client can't stall the session, and events for one connection
//! leave in exactly the order they were queued.

use gambit_protocol::{ConnectionId, ServerEvent};
use gambit_session::Broadcaster;
use tokio::sync::mpsc;

/// Channel sender for delivering events to one connection's writer task.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Routes session events to per-connection queues.
///
/// Connections are kept in registration order, so broadcasts reach them
/// in the order they joined.
#[derive(Debug, Default)]
pub struct ChannelBroadcaster {
    senders: Vec<(ConnectionId, EventSender)>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection's queue. Replaces an existing queue for the same
    /// identity.
    pub fn register(&mut self, conn: ConnectionId, sender: EventSender) {
        self.unregister(&conn);
        self.senders.push((conn, sender));
    }

    /// Drops a connection's queue. Its writer task ends once the queue
    /// drains.
    pub fn unregister(&mut self, conn: &ConnectionId) {
        self.senders.retain(|(id, _)| id != conn);
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl Broadcaster for ChannelBroadcaster {
    /// Silently drops the event if the receiver is gone.
    fn send_to(&mut self, conn: &ConnectionId, event: ServerEvent) {
        if let Some((_, sender)) = self.senders.iter().find(|(id, _)| id == conn) {
            let _ = sender.send(event);
        }
    }

    fn broadcast(&mut self, event: ServerEvent) {
        for (_, sender) in &self.senders {
            let _ = sender.send(event.clone());
        }
    }
}
