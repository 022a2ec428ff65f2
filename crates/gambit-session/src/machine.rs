//! The session state machine.
//!
//! [`SessionMachine`] is the only thing that mutates [`SessionState`].
//! Every input is a synchronous method call: a connection arrived or
//! left, a move was submitted, a timer fired. Every output goes through
//! the [`Broadcaster`] and [`Scheduler`] seams. Nothing here awaits, so a
//! transition is never observed half-done.

use std::time::Instant;

use gambit_oracle::{GameOracle, Outcome};
use gambit_protocol::{Color, ConnectionId, MovePayload, MoveSpec, Role, ServerEvent};
use tracing::{debug, info, warn};

use crate::{
    Broadcaster, DisconnectReconciler, MoveError, Phase, RoleAssigner, Scheduler, SessionConfig,
    SessionError, SessionState, TimerKey,
};

/// Display name used for players who didn't give one.
const ANONYMOUS: &str = "Anonymous";

/// A live connection, in arrival order.
#[derive(Debug, Clone)]
struct Peer {
    id: ConnectionId,
    name: Option<String>,
}

/// Drives one game session.
///
/// Generic over the rule engine `O`, the outbound channel `B` and the
/// timer backend `S`, so the same logic runs against the chess oracle and
/// real sockets in production and against scripted fakes in tests.
pub struct SessionMachine<O: GameOracle, B, S> {
    oracle: O,
    broadcaster: B,
    scheduler: S,
    config: SessionConfig,
    state: SessionState<O::Position>,
    reconciler: DisconnectReconciler,
    /// Live connections. Survives resets so they can be re-admitted.
    presence: Vec<Peer>,
}

impl<O, B, S> SessionMachine<O, B, S>
where
    O: GameOracle,
    B: Broadcaster,
    S: Scheduler,
{
    /// Creates a session at the oracle's start position with no one
    /// connected.
    pub fn new(oracle: O, broadcaster: B, scheduler: S, config: SessionConfig, now: Instant) -> Self {
        let state = SessionState::new(oracle.start_position(), now);
        Self {
            oracle,
            broadcaster,
            scheduler,
            config,
            state,
            reconciler: DisconnectReconciler::new(),
            presence: Vec::new(),
        }
    }

    // -- accessors -------------------------------------------------------

    pub fn state(&self) -> &SessionState<O::Position> {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn reconciler(&self) -> &DisconnectReconciler {
        &self.reconciler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    pub fn broadcaster_mut(&mut self) -> &mut B {
        &mut self.broadcaster
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Whether a live connection goes by `conn`.
    pub fn is_connected(&self, conn: &ConnectionId) -> bool {
        self.presence.iter().any(|p| &p.id == conn)
    }

    /// Live connections in arrival order.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.presence.iter().map(|p| &p.id)
    }

    fn board_state(&self) -> ServerEvent {
        ServerEvent::BoardState(self.oracle.serialize(&self.state.position))
    }

    fn display_name_of(&self, conn: &ConnectionId) -> String {
        self.presence
            .iter()
            .find(|p| &p.id == conn)
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| ANONYMOUS.to_owned())
    }

    // -- connection lifecycle -------------------------------------------

    /// A new connection arrived.
    ///
    /// It is told its identity right away. An identity whose seat is held
    /// for it takes the seat back on the spot; anyone else only gets a role
    /// once the arrival debounce has passed (see [`TimerKey::Arrival`]).
    ///
    /// # Errors
    /// [`SessionError::IdentityInUse`] if a live connection already goes
    /// by this identity.
    pub fn connect(
        &mut self,
        conn: ConnectionId,
        name: Option<String>,
        now: Instant,
    ) -> Result<(), SessionError> {
        if self.is_connected(&conn) {
            warn!(%conn, "identity already connected, refusing");
            return Err(SessionError::IdentityInUse(conn));
        }
        info!(%conn, name = name.as_deref().unwrap_or(ANONYMOUS), "connection joined");

        self.broadcaster.send_to(
            &conn,
            ServerEvent::Connected {
                connection_id: conn.clone(),
            },
        );
        self.presence.push(Peer {
            id: conn.clone(),
            name,
        });

        match RoleAssigner::held_seat(&self.state, &conn) {
            Some(color) => self.seat(color, conn, now),
            None => self
                .scheduler
                .schedule(TimerKey::Arrival(conn), self.config.arrival_debounce),
        }
        Ok(())
    }

    /// A connection went away.
    ///
    /// - seated: the seat is held for a grace period
    /// - spectator: simply removed
    /// - not yet assigned: its pending arrival is cancelled
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if `conn` isn't live.
    pub fn disconnect(&mut self, conn: &ConnectionId, now: Instant) -> Result<(), SessionError> {
        let Some(index) = self.presence.iter().position(|p| &p.id == conn) else {
            return Err(SessionError::UnknownConnection(conn.clone()));
        };
        self.presence.remove(index);

        match self.state.role_of(conn) {
            Some(Role::White) => self.vacate_seat(Color::White, conn, now),
            Some(Role::Black) => self.vacate_seat(Color::Black, conn, now),
            Some(Role::Spectator) => {
                self.state.spectators.retain(|s| s != conn);
                info!(%conn, "spectator left");
            }
            None => {
                self.scheduler.cancel(&TimerKey::Arrival(conn.clone()));
                debug!(%conn, "left before a role was assigned");
            }
        }
        Ok(())
    }

    fn vacate_seat(&mut self, color: Color, conn: &ConnectionId, now: Instant) {
        self.state.seats.take(color);
        self.state.display_names.take(color);

        if self.reconciler.is_expiring() {
            // A reset is already scheduled; nothing to hold.
            info!(%conn, ?color, "player left while session expiring");
            self.state.started = false;
            self.broadcaster.broadcast(self.state.players_info());
            return;
        }

        self.state.pending_reconnect.set(color, conn.clone());
        if self.state.started {
            self.state.suspended = true;
        }
        self.state.started = false;

        let grace = self.config.grace_period;
        if let Some(opponent) = self.state.seats.get(color.opponent()).cloned() {
            self.broadcaster.send_to(
                &opponent,
                ServerEvent::OpponentDisconnected {
                    message: format!(
                        "{color} disconnected. Waiting {}s for them to reconnect...",
                        grace.as_secs()
                    ),
                    color,
                },
            );
        }
        self.scheduler.schedule(TimerKey::Grace, grace);
        self.reconciler.seat_vacated(color, now, grace);
        info!(%conn, ?color, grace_secs = grace.as_secs(), "seated player disconnected, holding seat");

        self.broadcaster.broadcast(self.state.players_info());
    }

    /// An explicit `reconnectPlayer` request.
    ///
    /// Granted immediately (no debounce) when the seat for `color` is
    /// available or is being held for `old_id`. A connection that already
    /// holds a seat is ignored, as is a request for a seat someone else
    /// holds. A granted request cancels the connection's pending arrival.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if `conn` isn't live.
    pub fn reconnect_player(
        &mut self,
        conn: ConnectionId,
        color: Color,
        old_id: &ConnectionId,
        now: Instant,
    ) -> Result<(), SessionError> {
        if !self.is_connected(&conn) {
            return Err(SessionError::UnknownConnection(conn));
        }
        if let Some(Role::White | Role::Black) = self.state.role_of(&conn) {
            debug!(%conn, "already seated, reconnect request ignored");
            return Ok(());
        }
        if !RoleAssigner::can_claim(&self.state, color, old_id) {
            debug!(%conn, ?color, %old_id, "reconnect request refused, seat not claimable");
            return Ok(());
        }

        self.scheduler.cancel(&TimerKey::Arrival(conn.clone()));
        self.seat(color, conn, now);
        Ok(())
    }

    // -- timers -----------------------------------------------------------

    /// A timer armed through the [`Scheduler`] has fired.
    pub fn timer_fired(&mut self, key: TimerKey, now: Instant) {
        match key {
            TimerKey::Arrival(conn) => self.arrival_due(conn, now),
            TimerKey::Grace => self.grace_expired(),
            TimerKey::Reset => {
                info!("scheduled reset due");
                self.reset_game(now);
            }
        }
    }

    fn arrival_due(&mut self, conn: ConnectionId, now: Instant) {
        if !self.is_connected(&conn) {
            debug!(%conn, "stale arrival ignored");
            return;
        }
        if self.state.role_of(&conn).is_some() {
            debug!(%conn, "arrival already reconciled");
            return;
        }
        match RoleAssigner::assign(&self.state, &conn).color() {
            Some(color) => self.seat(color, conn, now),
            None => self.admit_spectator(conn),
        }
    }

    /// Seats `conn` at `color`. Every path into a seat ends here; if the
    /// seat was being held, this is the reconnection.
    fn seat(&mut self, color: Color, conn: ConnectionId, now: Instant) {
        let reclaimed = self.state.pending_reconnect.take(color).is_some();
        let name = self.display_name_of(&conn);

        self.state.spectators.retain(|s| s != &conn);
        self.state.seats.set(color, conn.clone());
        self.state.display_names.set(color, name);

        self.broadcaster.send_to(&conn, ServerEvent::PlayerRole(color));
        self.broadcaster.send_to(&conn, self.board_state());

        let opponent = self.state.seats.get(color.opponent()).cloned();
        if opponent.is_none() {
            self.broadcaster.send_to(
                &conn,
                ServerEvent::WaitingForOpponent("Waiting for an opponent to join...".to_owned()),
            );
        }

        if reclaimed {
            info!(%conn, ?color, "player reclaimed held seat");
            let still_held = Color::ALL
                .into_iter()
                .find(|&c| self.state.pending_reconnect.get(c).is_some());
            if self.reconciler.seat_reclaimed(still_held) {
                self.scheduler.cancel(&TimerKey::Grace);
            }
            if let Some(opponent) = &opponent {
                self.broadcaster.send_to(
                    opponent,
                    ServerEvent::OpponentReconnected(format!("{color} reconnected.")),
                );
            }
            if self.state.suspended && self.state.seats.both() {
                self.state.started = true;
                self.state.suspended = false;
                if self.state.outcome.is_none() {
                    info!("game resumed");
                    self.broadcaster.broadcast(ServerEvent::GameResumed(
                        "Both players are back. The game continues.".to_owned(),
                    ));
                }
            }
        } else {
            info!(%conn, ?color, "seat assigned");
        }

        self.broadcaster.broadcast(self.state.players_info());
        self.check_game_start(now);
    }

    fn admit_spectator(&mut self, conn: ConnectionId) {
        info!(%conn, spectators = self.state.spectators.len() + 1, "spectator joined");
        self.broadcaster.send_to(&conn, ServerEvent::SpectatorRole);
        self.broadcaster.send_to(
            &conn,
            ServerEvent::SpectatorMessage(
                "Both seats are taken. You are watching as a spectator.".to_owned(),
            ),
        );
        self.broadcaster.send_to(&conn, self.board_state());
        self.broadcaster.send_to(&conn, self.state.players_info());
        self.state.spectators.push(conn);
    }

    fn grace_expired(&mut self) {
        let Some(color) = self.reconciler.grace_expired() else {
            debug!("stale grace expiry ignored");
            return;
        };
        info!(?color, "grace period expired");

        for held in Color::ALL {
            if self.state.pending_reconnect.take(held).is_some() {
                self.broadcaster.broadcast(ServerEvent::PlayerLeft {
                    message: format!("{held} left the game. The session will reset."),
                    color: held,
                });
            }
        }
        self.scheduler
            .schedule(TimerKey::Reset, self.config.expiry_reset_delay);
    }

    // -- game lifecycle ---------------------------------------------------

    /// Starts the game if both seats are filled and it isn't running.
    ///
    /// Returns `true` if the game started.
    pub fn check_game_start(&mut self, now: Instant) -> bool {
        if self.state.started
            || self.state.outcome.is_some()
            || !self.state.seats.both()
            || self.reconciler.is_expiring()
        {
            return false;
        }
        self.state.started = true;
        self.state.suspended = false;
        self.state.last_activity = now;
        info!(
            white = ?self.state.display_names.white,
            black = ?self.state.display_names.black,
            "game started"
        );

        self.broadcaster.broadcast(ServerEvent::GameStarted);
        self.broadcaster.broadcast(self.board_state());
        self.broadcaster.broadcast(self.state.players_info());
        true
    }

    /// A move submitted by `conn`.
    ///
    /// Checked in order: the game is running, it isn't over, `conn` holds
    /// the seat whose turn it is, the oracle accepts the move. Any failure
    /// leaves the state untouched; only an illegal move is reported back
    /// (as `invalidMove`).
    ///
    /// An accepted move is broadcast as `move` followed by `boardState`,
    /// then checked for a terminal outcome.
    pub fn submit_move(
        &mut self,
        conn: &ConnectionId,
        mv: MoveSpec,
        now: Instant,
    ) -> Result<(), MoveError> {
        if !self.state.started {
            debug!(%conn, %mv, "move before game start ignored");
            return Err(MoveError::GameNotStarted);
        }
        if self.state.outcome.is_some() {
            debug!(%conn, %mv, "move after game over ignored");
            return Err(MoveError::GameFinished);
        }
        let turn = self.oracle.current_turn(&self.state.position);
        if self.state.seats.get(turn) != Some(conn) {
            debug!(%conn, %mv, ?turn, "move out of turn ignored");
            return Err(MoveError::NotYourTurn);
        }
        if let Err(e) = self.oracle.apply_move(&mut self.state.position, &mv) {
            debug!(%conn, %mv, error = %e, "illegal move rejected");
            self.broadcaster
                .send_to(conn, ServerEvent::InvalidMove(MovePayload::Parsed(mv)));
            return Err(MoveError::IllegalMove(e));
        }

        self.state.last_activity = now;
        debug!(%conn, %mv, "move accepted");
        self.broadcaster.broadcast(ServerEvent::Move(mv));
        self.broadcaster.broadcast(self.board_state());

        if let Some(outcome) = self.oracle.outcome(&self.state.position) {
            self.finish(outcome);
        }
        Ok(())
    }

    /// A `move` event whose payload didn't parse. The raw payload is
    /// echoed back to the submitter.
    pub fn malformed_move(&mut self, conn: &ConnectionId, payload: MovePayload) -> MoveError {
        debug!(%conn, "malformed move payload");
        self.broadcaster
            .send_to(conn, ServerEvent::InvalidMove(payload));
        MoveError::MalformedMovePayload
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(%outcome, "game over");
        self.state.outcome = Some(outcome);
        self.broadcaster
            .broadcast(ServerEvent::GameOver(outcome.message()));
        self.scheduler
            .schedule(TimerKey::Reset, self.config.game_over_reset_delay);
    }

    /// Anyone may ask for a rematch; the session resets at once.
    pub fn request_rematch(&mut self, conn: &ConnectionId, now: Instant) {
        info!(%conn, "rematch requested");
        self.reset_game(now);
    }

    /// Resets the session if a started game has gone without an accepted
    /// move for the idle timeout. Returns `true` if it reset.
    pub fn sweep_idle(&mut self, now: Instant) -> bool {
        if !self.state.started {
            return false;
        }
        let idle = now.saturating_duration_since(self.state.last_activity);
        if idle < self.config.idle_timeout {
            return false;
        }
        info!(idle_secs = idle.as_secs(), "game abandoned, resetting");
        self.reset_game(now);
        true
    }

    /// Puts the session back to its initial state.
    ///
    /// Cancels every timer, empties all seats, then re-admits every live
    /// connection as a fresh (debounced) arrival. Calling it twice in a
    /// row leaves the same state as calling it once.
    pub fn reset_game(&mut self, now: Instant) {
        self.scheduler.cancel_all();
        self.reconciler.reset();
        self.state = SessionState::new(self.oracle.start_position(), now);
        info!(connections = self.presence.len(), "session reset");

        self.broadcaster.broadcast(ServerEvent::GameReset);
        self.broadcaster.broadcast(self.state.players_info());

        for peer in &self.presence {
            self.scheduler
                .schedule(TimerKey::Arrival(peer.id.clone()), self.config.arrival_debounce);
        }
    }
}
