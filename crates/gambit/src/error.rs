//! Unified error type for the Gambit server.

use gambit_oracle::OracleError;
use gambit_protocol::ProtocolError;
use gambit_session::SessionError;
use gambit_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GambitError {
    /// A transport-level error (accept, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (identity in use, actor gone).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A rule-engine error (unparseable position).
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[cfg(test)]
mod tests {
    use gambit_protocol::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Send("peer gone".into());
        let gambit_err: GambitError = err.into();
        assert!(matches!(gambit_err, GambitError::Transport(_)));
        assert!(gambit_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownEvent("resign".into());
        let gambit_err: GambitError = err.into();
        assert!(matches!(gambit_err, GambitError::Protocol(_)));
        assert_eq!(gambit_err.to_string(), "unknown event \"resign\"");
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::IdentityInUse(ConnectionId::new("dup"));
        let gambit_err: GambitError = err.into();
        assert!(matches!(gambit_err, GambitError::Session(_)));
        assert_eq!(gambit_err.to_string(), "identity dup is already connected");
    }

    #[test]
    fn test_from_oracle_error() {
        let err = OracleError::InvalidPosition("junk".into());
        let gambit_err: GambitError = err.into();
        assert!(matches!(gambit_err, GambitError::Oracle(_)));
    }
}
