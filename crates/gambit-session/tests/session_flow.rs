//! End-to-end session scenarios with real chess rules and real timers.
//!
//! The machine is driven the way the server's actor drives it: commands
//! are applied directly, and timers are awaited from the `TimerSet` and
//! fed back through `timer_fired`. Tokio time is paused, so a 20-second
//! grace period takes no wall-clock time.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gambit_oracle::ChessOracle;
use gambit_protocol::{Color, ConnectionId, MoveSpec, ServerEvent};
use gambit_session::{Broadcaster, Phase, SessionConfig, SessionMachine, TimerKey};
use gambit_timer::TimerSet;

// =========================================================================
// Harness
// =========================================================================

/// Per-connection inboxes. Broadcasts go to every live connection.
#[derive(Default)]
struct Inboxes {
    live: Vec<ConnectionId>,
    received: HashMap<ConnectionId, Vec<ServerEvent>>,
}

impl Broadcaster for Inboxes {
    fn send_to(&mut self, conn: &ConnectionId, event: ServerEvent) {
        if self.live.contains(conn) {
            self.received.entry(conn.clone()).or_default().push(event);
        }
    }

    fn broadcast(&mut self, event: ServerEvent) {
        for conn in &self.live {
            self.received
                .entry(conn.clone())
                .or_default()
                .push(event.clone());
        }
    }
}

type Machine = SessionMachine<ChessOracle, Inboxes, TimerSet<TimerKey>>;

/// Reads the clock through tokio, so paused time moves it along with the
/// timers.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

fn id(s: &str) -> ConnectionId {
    ConnectionId::new(s)
}

fn new_machine() -> Machine {
    SessionMachine::new(
        ChessOracle,
        Inboxes::default(),
        TimerSet::new(),
        SessionConfig::default(),
        now(),
    )
}

fn join(m: &mut Machine, conn: &str) {
    m.broadcaster_mut().live.push(id(conn));
    m.connect(id(conn), None, now()).expect("connect");
}

fn leave(m: &mut Machine, conn: &str) {
    m.broadcaster_mut().live.retain(|c| c.as_str() != conn);
    m.disconnect(&id(conn), now()).expect("disconnect");
}

/// Waits for the next timer and applies it. Returns its key.
async fn next_timer(m: &mut Machine) -> TimerKey {
    let key = m.scheduler_mut().wait_for_next().await;
    m.timer_fired(key.clone(), now());
    key
}

/// Drains and returns what `conn` has received so far.
fn take(m: &mut Machine, conn: &str) -> Vec<ServerEvent> {
    m.broadcaster_mut()
        .received
        .remove(&id(conn))
        .unwrap_or_default()
}

async fn two_players_seated() -> Machine {
    let mut m = new_machine();
    join(&mut m, "white");
    join(&mut m, "black");
    assert_eq!(next_timer(&mut m).await, TimerKey::Arrival(id("white")));
    assert_eq!(next_timer(&mut m).await, TimerKey::Arrival(id("black")));
    assert_eq!(m.phase(), Phase::InProgress);
    take(&mut m, "white");
    take(&mut m, "black");
    m
}

fn play(m: &mut Machine, conn: &str, from: &str, to: &str) {
    m.submit_move(&id(conn), MoveSpec::new(from, to), now())
        .unwrap_or_else(|e| panic!("{from}{to} by {conn} should be accepted: {e}"));
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_opening_move_reaches_both_players_in_order() {
    let mut m = two_players_seated().await;

    play(&mut m, "white", "e2", "e4");

    for conn in ["white", "black"] {
        let events = take(&mut m, conn);
        assert_eq!(events.len(), 2, "{conn}: {events:?}");
        assert_eq!(events[0], ServerEvent::Move(MoveSpec::new("e2", "e4")));
        let ServerEvent::BoardState(fen) = &events[1] else {
            panic!("{conn} expected boardState, got {:?}", events[1]);
        };
        assert!(fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_black_moving_first_changes_nothing() {
    let mut m = two_players_seated().await;
    let before = m.state().clone();

    assert!(m
        .submit_move(&id("black"), MoveSpec::new("e7", "e5"), now())
        .is_err());

    assert_eq!(m.state(), &before);
    assert!(take(&mut m, "black").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_then_reconnect_within_grace_resumes() {
    let mut m = two_players_seated().await;
    let start = tokio::time::Instant::now();

    leave(&mut m, "black");
    let white = take(&mut m, "white");
    assert!(white
        .iter()
        .any(|e| matches!(e, ServerEvent::OpponentDisconnected { color: Color::Black, .. })));
    assert_eq!(m.phase(), Phase::WaitingForPlayers);

    tokio::time::advance(Duration::from_secs(10)).await;
    join(&mut m, "black");

    assert!(start.elapsed() < Duration::from_secs(20));
    assert_eq!(m.phase(), Phase::InProgress);
    assert!(!m.scheduler().is_armed(&TimerKey::Grace));
    let white = take(&mut m, "white");
    assert!(white.contains(&ServerEvent::OpponentReconnected("Black reconnected.".into())));
    assert!(white.iter().any(|e| matches!(e, ServerEvent::GameResumed(_))));

    // Play continues where it left off.
    play(&mut m, "white", "e2", "e4");
    play(&mut m, "black", "e7", "e5");
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_expiry_then_reset() {
    let mut m = two_players_seated().await;
    play(&mut m, "white", "e2", "e4");
    let start = tokio::time::Instant::now();

    leave(&mut m, "black");

    assert_eq!(next_timer(&mut m).await, TimerKey::Grace);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert!(take(&mut m, "white").contains(&ServerEvent::PlayerLeft {
        message: "Black left the game. The session will reset.".into(),
        color: Color::Black,
    }));

    assert_eq!(next_timer(&mut m).await, TimerKey::Reset);
    assert_eq!(start.elapsed(), Duration::from_secs(22));
    assert_eq!(take(&mut m, "white")[0], ServerEvent::GameReset);

    // The survivor is re-admitted as a fresh arrival on a fresh board.
    assert_eq!(next_timer(&mut m).await, TimerKey::Arrival(id("white")));
    let white = take(&mut m, "white");
    assert_eq!(white[0], ServerEvent::PlayerRole(Color::White));
    let ServerEvent::BoardState(fen) = &white[1] else {
        panic!("expected boardState, got {:?}", white[1]);
    };
    assert!(fen.starts_with("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w"));
}

#[tokio::test(start_paused = true)]
async fn test_queen_checkmate_ends_game_and_resets() {
    let mut m = two_players_seated().await;
    play(&mut m, "white", "f2", "f3");
    play(&mut m, "black", "e7", "e5");
    play(&mut m, "white", "g2", "g4");
    play(&mut m, "black", "d8", "h4");
    let start = tokio::time::Instant::now();

    assert_eq!(m.phase(), Phase::GameOver);
    for conn in ["white", "black"] {
        let events = take(&mut m, conn);
        assert_eq!(
            events.last(),
            Some(&ServerEvent::GameOver("Checkmate! Black wins!".into()))
        );
    }
    assert!(m
        .submit_move(&id("white"), MoveSpec::new("a2", "a3"), now())
        .is_err());

    assert_eq!(next_timer(&mut m).await, TimerKey::Reset);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(m.phase(), Phase::WaitingForPlayers);
    assert_eq!(take(&mut m, "black")[0], ServerEvent::GameReset);

    // Both are re-seated in arrival order and a new game starts.
    next_timer(&mut m).await;
    next_timer(&mut m).await;
    assert_eq!(m.phase(), Phase::InProgress);
    assert_eq!(m.state().seats.white, Some(id("white")));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_reconnect_and_arrival_never_double_assign() {
    let mut m = two_players_seated().await;
    leave(&mut m, "black");

    // A new socket claims the held seat before its own arrival fires.
    join(&mut m, "black-2");
    m.reconnect_player(id("black-2"), Color::Black, &id("black"), now())
        .expect("reconnect");
    assert_eq!(m.state().seats.black, Some(id("black-2")));

    // Another newcomer's arrival sees both seats taken.
    join(&mut m, "late");
    assert_eq!(next_timer(&mut m).await, TimerKey::Arrival(id("late")));
    assert_eq!(m.state().spectators, vec![id("late")]);
    assert!(m.scheduler().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_just_before_grace_deadline_keeps_game() {
    let mut m = two_players_seated().await;
    play(&mut m, "white", "e2", "e4");
    leave(&mut m, "black");

    // Back inside the window by less than the arrival debounce.
    tokio::time::advance(Duration::from_millis(19_950)).await;
    join(&mut m, "black");

    assert_eq!(m.state().seats.black, Some(id("black")));
    assert!(m.scheduler().is_empty());
    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(m.phase(), Phase::InProgress);
    assert!(!take(&mut m, "white")
        .iter()
        .any(|e| matches!(e, ServerEvent::PlayerLeft { .. } | ServerEvent::GameReset)));
    play(&mut m, "black", "e7", "e5");
}

#[tokio::test(start_paused = true)]
async fn test_idle_sweep_measures_paused_time() {
    let mut m = two_players_seated().await;

    tokio::time::advance(Duration::from_secs(30 * 60)).await;

    assert!(m.sweep_idle(now()));
    assert_eq!(take(&mut m, "white")[0], ServerEvent::GameReset);
}
