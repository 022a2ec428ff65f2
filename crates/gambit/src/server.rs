//! `GambitServer` builder and server loop.
//!
//! This is the entry point for running a Gambit server. It ties together
//! all the layers: transport → protocol → session actor.

use gambit_oracle::GameOracle;
use gambit_protocol::JsonCodec;
use gambit_session::SessionConfig;
use gambit_transport::{Incoming, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{GambitError, SessionHandle, spawn_session};

/// Default capacity of the session actor's command channel.
const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Builder for configuring and starting a Gambit server.
///
/// # Example
///
/// ```rust,ignore
/// use gambit::prelude::*;
///
/// let server = GambitServer::builder()
///     .bind("0.0.0.0:3000")
///     .session_config(SessionConfig::default())
///     .build(ChessOracle::new())
///     .await?;
/// server.run().await
/// ```
pub struct GambitServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    channel_size: usize,
}

impl GambitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            session_config: SessionConfig::default(),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session timing configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the capacity of the session actor's command channel.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Binds the listener and starts the session actor.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<O: GameOracle>(self, oracle: O) -> Result<GambitServer, GambitError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let session = spawn_session(oracle, self.session_config, self.channel_size);
        Ok(GambitServer {
            transport,
            session,
            codec: JsonCodec,
        })
    }
}

impl Default for GambitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Gambit server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GambitServer {
    transport: WebSocketTransport,
    session: SessionHandle,
    codec: JsonCodec,
}

impl GambitServer {
    /// Creates a new builder.
    pub fn builder() -> GambitServerBuilder {
        GambitServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the session actor, e.g. to take a snapshot.
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a task for each, which runs
    /// the WebSocket upgrade and then the connection handler. Runs until
    /// the process is terminated.
    pub async fn run(mut self) -> Result<(), GambitError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Gambit server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let session = self.session.clone();
                    let codec = self.codec;
                    tokio::spawn(async move {
                        let addr = incoming.peer_addr();
                        let conn = match incoming.establish().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%addr, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, session, codec).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
