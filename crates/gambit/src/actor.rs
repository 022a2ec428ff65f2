//! Session actor: one Tokio task that owns the session machine.
//!
//! Connection handlers never touch the session directly. They send
//! commands through a [`SessionHandle`] and the actor applies them one at
//! a time, interleaved with fired timers and the idle sweep. Because only
//! this task mutates the session, no transition is ever seen half-done.

use std::time::Instant;

use gambit_oracle::GameOracle;
use gambit_protocol::{ClientEvent, ConnectionId, MovePayload};
use gambit_session::{Phase, SessionConfig, SessionError, SessionMachine, TimerKey};
use gambit_timer::{Sweep, TimerSet};
use tokio::sync::{mpsc, oneshot};

use crate::{ChannelBroadcaster, EventSender};

/// The session's clock. Read through tokio so it agrees with the timer set
/// and the sweep, including under paused test time.
fn session_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Commands sent to the session actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum SessionCommand {
    /// A new connection. `sender` is its outbound queue.
    Connect {
        conn: ConnectionId,
        name: Option<String>,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// The connection closed.
    Disconnect {
        conn: ConnectionId,
        reply: oneshot::Sender<()>,
    },

    /// A decoded event from a connection.
    Event { conn: ConnectionId, event: ClientEvent },

    /// A `move` event whose payload didn't parse.
    MalformedMove {
        conn: ConnectionId,
        payload: MovePayload,
    },

    /// Request a snapshot of the session.
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },

    /// Stop the actor.
    Shutdown,
}

/// A read-only summary of the session, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Who holds the White seat.
    pub white: Option<ConnectionId>,
    /// Who holds the Black seat.
    pub black: Option<ConnectionId>,
    /// Number of spectators.
    pub spectators: usize,
    /// Number of live connections.
    pub connections: usize,
    /// The serialized position.
    pub position: String,
}

/// Handle to the running session actor.
///
/// Cheap to clone: it's just an `mpsc::Sender` wrapper. Every connection
/// handler holds one.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Registers a connection and its outbound queue.
    ///
    /// # Errors
    /// [`SessionError::IdentityInUse`] if the identity is already live;
    /// [`SessionError::Unavailable`] if the actor has stopped.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        name: Option<String>,
        sender: EventSender,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Connect {
                conn,
                name,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Tells the session a connection closed. Waits until the actor has
    /// processed it.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Disconnect {
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }

    /// Delivers a client event (fire-and-forget).
    pub async fn dispatch(&self, conn: ConnectionId, event: ClientEvent) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Event { conn, event })
            .await
            .map_err(|_| SessionError::Unavailable)
    }

    /// Reports a `move` whose payload didn't parse (fire-and-forget).
    pub async fn malformed_move(
        &self,
        conn: ConnectionId,
        payload: MovePayload,
    ) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::MalformedMove { conn, payload })
            .await
            .map_err(|_| SessionError::Unavailable)
    }

    /// Requests a snapshot of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable)
    }
}

type Machine<O> = SessionMachine<O, ChannelBroadcaster, TimerSet<TimerKey>>;

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<O: GameOracle> {
    machine: Machine<O>,
    sweep: Sweep,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl<O: GameOracle> SessionActor<O> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!("session actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                key = self.machine.scheduler_mut().wait_for_next() => {
                    self.machine.timer_fired(key, session_now());
                }
                _ = self.sweep.tick() => {
                    self.machine.sweep_idle(session_now());
                }
            }
        }

        tracing::info!("session actor stopped");
    }

    /// Applies one command. Returns `false` to stop the actor.
    fn handle(&mut self, cmd: SessionCommand) -> bool {
        let now = session_now();
        match cmd {
            SessionCommand::Connect {
                conn,
                name,
                sender,
                reply,
            } => {
                // Register the queue first so the `connected` event the
                // machine emits has somewhere to go.
                let result = if self.machine.is_connected(&conn) {
                    Err(SessionError::IdentityInUse(conn))
                } else {
                    self.machine
                        .broadcaster_mut()
                        .register(conn.clone(), sender);
                    self.machine.connect(conn, name, now)
                };
                let _ = reply.send(result);
            }
            SessionCommand::Disconnect { conn, reply } => {
                self.machine.broadcaster_mut().unregister(&conn);
                if let Err(e) = self.machine.disconnect(&conn, now) {
                    tracing::debug!(%conn, error = %e, "disconnect ignored");
                }
                let _ = reply.send(());
            }
            SessionCommand::Event { conn, event } => self.handle_event(conn, event, now),
            SessionCommand::MalformedMove { conn, payload } => {
                self.machine.malformed_move(&conn, payload);
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Shutdown => {
                tracing::info!("session shutting down");
                return false;
            }
        }
        true
    }

    fn handle_event(&mut self, conn: ConnectionId, event: ClientEvent, now: Instant) {
        if !self.machine.is_connected(&conn) {
            tracing::warn!(%conn, "event from unknown connection, ignoring");
            return;
        }
        match event {
            ClientEvent::Move(mv) => {
                if let Err(e) = self.machine.submit_move(&conn, mv, now) {
                    tracing::debug!(%conn, error = %e, reported = e.is_reported(), "move rejected");
                }
            }
            ClientEvent::ReconnectPlayer {
                role,
                old_connection_id,
            } => {
                if let Err(e) = self
                    .machine
                    .reconnect_player(conn, role, &old_connection_id, now)
                {
                    tracing::debug!(error = %e, "reconnect request failed");
                }
            }
            ClientEvent::RequestRematch => self.machine.request_rematch(&conn, now),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let state = self.machine.state();
        SessionSnapshot {
            phase: state.phase(),
            white: state.seats.white.clone(),
            black: state.seats.black.clone(),
            spectators: state.spectators.len(),
            connections: self.machine.connections().count(),
            position: self.machine.oracle().serialize(&state.position),
        }
    }
}

/// Spawns the session actor and returns a handle to it.
///
/// `channel_size` controls backpressure: if the command channel fills up,
/// handlers wait (bounded channel).
pub fn spawn_session<O: GameOracle>(
    oracle: O,
    config: SessionConfig,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let sweep = Sweep::new(config.idle_sweep_interval);

    let actor = SessionActor {
        machine: SessionMachine::new(
            oracle,
            ChannelBroadcaster::new(),
            TimerSet::new(),
            config,
            session_now(),
        ),
        sweep,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    SessionHandle { sender: tx }
}
