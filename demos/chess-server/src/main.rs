//! Standalone chess server: one game, two seats, any number of spectators.
//!
//! ```text
//! cargo run -p chess-server -- --port 3000
//! RUST_LOG=gambit_session=debug cargo run -p chess-server
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gambit::GambitServerBuilder;
use gambit_oracle::ChessOracle;
use gambit_session::SessionConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Single-session chess server over WebSocket
#[derive(Parser, Debug)]
#[command(name = "chess-server")]
#[command(version)]
struct Cli {
    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Seconds a disconnected player's seat is held
    #[arg(long, env = "GAMBIT_GRACE_SECS", default_value = "20")]
    grace_secs: u64,

    /// Seconds between game over and the automatic reset
    #[arg(long, env = "GAMBIT_GAME_OVER_RESET_SECS", default_value = "5")]
    game_over_reset_secs: u64,

    /// Seconds between an expired grace period and the reset
    #[arg(long, env = "GAMBIT_EXPIRY_RESET_SECS", default_value = "2")]
    expiry_reset_secs: u64,

    /// Minutes without a move before a running game is abandoned
    #[arg(long, env = "GAMBIT_IDLE_MINUTES", default_value = "30")]
    idle_minutes: u64,

    /// Seconds between idle checks
    #[arg(
        long,
        env = "GAMBIT_IDLE_SWEEP_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    idle_sweep_secs: u64,

    /// Milliseconds a new connection waits before it is given a role
    #[arg(long, env = "GAMBIT_ARRIVAL_DEBOUNCE_MS", default_value = "100")]
    arrival_debounce_ms: u64,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            grace_period: Duration::from_secs(self.grace_secs),
            game_over_reset_delay: Duration::from_secs(self.game_over_reset_secs),
            expiry_reset_delay: Duration::from_secs(self.expiry_reset_secs),
            idle_timeout: Duration::from_secs(self.idle_minutes * 60),
            idle_sweep_interval: Duration::from_secs(self.idle_sweep_secs),
            arrival_debounce: Duration::from_millis(self.arrival_debounce_ms),
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = cli.addr();
    let server = GambitServerBuilder::new()
        .bind(&addr)
        .session_config(cli.session_config())
        .build(ChessOracle::new())
        .await
        .with_context(|| format!("failed to start server on {addr}"))?;

    info!(%addr, "chess server ready");

    tokio::select! {
        result = server.run() => result.context("server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_match_session_defaults() {
        let cli = Cli::try_parse_from(["chess-server"]).unwrap();
        assert_eq!(cli.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_cli_flags_override_session_timings() {
        let cli = Cli::try_parse_from([
            "chess-server",
            "--port",
            "4000",
            "--grace-secs",
            "5",
            "--game-over-reset-secs",
            "3",
            "--expiry-reset-secs",
            "1",
            "--idle-minutes",
            "1",
            "--idle-sweep-secs",
            "10",
            "--arrival-debounce-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(cli.port, 4000);
        assert_eq!(
            cli.session_config(),
            SessionConfig {
                grace_period: Duration::from_secs(5),
                game_over_reset_delay: Duration::from_secs(3),
                expiry_reset_delay: Duration::from_secs(1),
                idle_timeout: Duration::from_secs(60),
                idle_sweep_interval: Duration::from_secs(10),
                arrival_debounce: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_cli_zero_idle_sweep_is_rejected() {
        let result = Cli::try_parse_from(["chess-server", "--idle-sweep-secs", "0"]);
        assert!(result.is_err());
    }
}
