//! Per-connection handler: registration, event routing, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the session → receive `connected`, or be refused
//!   2. Spawn a writer task draining the connection's outbound queue
//!   3. Loop: receive frames → decode → forward to the session actor
//!   4. On close, tell the session the connection is gone

use std::sync::Arc;

use gambit_protocol::{
    ClientEvent, Codec, ConnectionId, MovePayload, ProtocolError, RawEvent, ServerEvent,
};
use gambit_session::SessionError;
use gambit_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::{GambitError, SessionHandle};

/// Drop guard that disconnects the connection from the session if the
/// handler exits early (an error or a panic).
///
/// Since `Drop` is synchronous, it spawns a fire-and-forget task. On a
/// normal close the handler calls [`release`](Self::release) instead,
/// which waits for the session to process the disconnect.
struct SessionGuard {
    conn: ConnectionId,
    handle: Option<SessionHandle>,
}

impl SessionGuard {
    async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.disconnect(self.conn.clone()).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let conn = self.conn.clone();
            tokio::spawn(async move {
                let _ = handle.disconnect(conn).await;
            });
        }
    }
}

/// What an inbound frame turned out to be.
#[derive(Debug)]
enum Inbound {
    Event(ClientEvent),
    MalformedMove(MovePayload),
    Ignored(ProtocolError),
}

/// Decodes a frame. A frame tagged `move` whose payload doesn't parse is
/// reported as malformed rather than dropped, so the sender gets its
/// payload echoed back in `invalidMove`.
fn decode_inbound(codec: &impl Codec, data: &[u8]) -> Inbound {
    let err = match codec.decode::<ClientEvent>(data) {
        Ok(event) => return Inbound::Event(event),
        Err(e) => e,
    };
    match codec.decode::<RawEvent>(data) {
        Ok(raw) if raw.event == "move" => Inbound::MalformedMove(MovePayload::Raw(raw.data)),
        Ok(raw) if is_known_event(&raw.event) => Inbound::Ignored(err),
        Ok(raw) => Inbound::Ignored(ProtocolError::UnknownEvent(raw.event)),
        Err(_) => Inbound::Ignored(err),
    }
}

fn is_known_event(name: &str) -> bool {
    matches!(name, "move" | "reconnectPlayer" | "requestRematch")
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    handle: SessionHandle,
    codec: C,
) -> Result<(), GambitError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id().clone();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Register ---
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let name = conn.display_name().map(str::to_owned);
    if let Err(e) = handle.connect(conn_id.clone(), name, tx).await {
        if matches!(e, SessionError::IdentityInUse(_)) {
            tracing::warn!(%conn_id, "refusing duplicate identity");
            let bytes = codec.encode(&ServerEvent::Error {
                message: e.to_string(),
            })?;
            conn.send(&bytes).await?;
        }
        let _ = conn.close().await;
        return Err(e.into());
    }
    let guard = SessionGuard {
        conn: conn_id.clone(),
        handle: Some(handle.clone()),
    };

    // --- Step 2: Writer ---
    let writer = {
        let conn = Arc::clone(&conn);
        let codec = codec.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
                    break;
                }
            }
        })
    };

    // --- Step 3: Read loop ---
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        match decode_inbound(&codec, &data) {
            Inbound::Event(event) => handle.dispatch(conn_id.clone(), event).await?,
            Inbound::MalformedMove(payload) => {
                handle.malformed_move(conn_id.clone(), payload).await?;
            }
            Inbound::Ignored(reason) => {
                tracing::debug!(%conn_id, %reason, "ignoring frame");
            }
        }
    }

    // --- Step 4: Cleanup ---
    // Unregistering drops the outbound queue, which ends the writer.
    guard.release().await;
    let _ = writer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use gambit_protocol::{Color, JsonCodec, MoveSpec};

    use super::*;

    fn decode(json: &str) -> Inbound {
        decode_inbound(&JsonCodec, json.as_bytes())
    }

    #[test]
    fn test_decode_inbound_valid_move() {
        let inbound = decode(r#"{"event":"move","data":{"from":"e2","to":"e4"}}"#);
        assert!(matches!(
            inbound,
            Inbound::Event(ClientEvent::Move(ref mv)) if mv == &MoveSpec::new("e2", "e4")
        ));
    }

    #[test]
    fn test_decode_inbound_reconnect_player() {
        let inbound =
            decode(r#"{"event":"reconnectPlayer","data":{"role":"b","oldConnectionId":"abc"}}"#);
        assert!(matches!(
            inbound,
            Inbound::Event(ClientEvent::ReconnectPlayer { role: Color::Black, .. })
        ));
    }

    #[test]
    fn test_decode_inbound_malformed_move_keeps_payload() {
        let inbound = decode(r#"{"event":"move","data":{"from":42}}"#);
        let Inbound::MalformedMove(MovePayload::Raw(raw)) = inbound else {
            panic!("expected malformed move, got {inbound:?}");
        };
        assert_eq!(raw, serde_json::json!({"from": 42}));
    }

    #[test]
    fn test_decode_inbound_move_without_data_is_malformed() {
        let inbound = decode(r#"{"event":"move"}"#);
        assert!(matches!(
            inbound,
            Inbound::MalformedMove(MovePayload::Raw(serde_json::Value::Null))
        ));
    }

    #[test]
    fn test_decode_inbound_unknown_event_is_ignored() {
        let inbound = decode(r#"{"event":"chat","data":"hi"}"#);
        assert!(matches!(
            inbound,
            Inbound::Ignored(ProtocolError::UnknownEvent(ref name)) if name == "chat"
        ));
    }

    #[test]
    fn test_decode_inbound_bad_reconnect_data_is_decode_error() {
        let inbound = decode(r#"{"event":"reconnectPlayer","data":{"role":"x"}}"#);
        assert!(matches!(inbound, Inbound::Ignored(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_inbound_garbage_is_ignored() {
        assert!(matches!(decode("not json"), Inbound::Ignored(_)));
    }
}
