//! Parsing of the upgrade request's query string.
//!
//! Clients identify themselves on the WebSocket upgrade URI:
//!
//! ```text
//! ws://host:3000/?id=3f9c0a...&name=Magnus
//! ```
//!
//! Both parameters are optional and `application/x-www-form-urlencoded`.
//! A missing or invalid `id` gets a freshly generated identity; a missing
//! `name` leaves the display name unset.

use url::form_urlencoded;

use crate::ConnectionId;

/// Longest display name kept, in characters. Longer names are truncated.
const MAX_NAME_CHARS: usize = 32;

/// Who is on the other end of a freshly accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// The identity the connection will be known by.
    pub id: ConnectionId,
    /// The display name the client asked for, if any.
    pub display_name: Option<String>,
}

impl PeerInfo {
    /// Builds peer info from the raw query string (the part after `?`).
    pub fn from_query(query: Option<&str>) -> Self {
        let mut id = None;
        let mut display_name = None;

        let pairs = form_urlencoded::parse(query.unwrap_or("").as_bytes());
        for (key, value) in pairs {
            match key.as_ref() {
                "id" if ConnectionId::is_valid(&value) => {
                    id = Some(ConnectionId::new(value));
                }
                "name" => {
                    let trimmed: String =
                        value.trim().chars().take(MAX_NAME_CHARS).collect();
                    if !trimmed.is_empty() {
                        display_name = Some(trimmed);
                    }
                }
                _ => {}
            }
        }

        Self {
            id: id.unwrap_or_else(ConnectionId::generate),
            display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_none_generates_identity() {
        let peer = PeerInfo::from_query(None);
        assert_eq!(peer.id.as_str().len(), 32);
        assert_eq!(peer.display_name, None);
    }

    #[test]
    fn test_from_query_reads_id_and_name() {
        let peer = PeerInfo::from_query(Some("id=white-1&name=Judit+Polgar"));
        assert_eq!(peer.id, ConnectionId::new("white-1"));
        assert_eq!(peer.display_name.as_deref(), Some("Judit Polgar"));
    }

    #[test]
    fn test_from_query_invalid_id_is_replaced() {
        let peer = PeerInfo::from_query(Some("id=bad%20id"));
        assert_ne!(peer.id.as_str(), "bad id");
        assert_eq!(peer.id.as_str().len(), 32);
    }

    #[test]
    fn test_from_query_decodes_percent_escapes_in_name() {
        let peer = PeerInfo::from_query(Some("name=Jos%C3%A9"));
        assert_eq!(peer.display_name.as_deref(), Some("José"));
    }

    #[test]
    fn test_from_query_blank_name_is_ignored() {
        let peer = PeerInfo::from_query(Some("name=+++"));
        assert_eq!(peer.display_name, None);
    }

    #[test]
    fn test_from_query_truncates_long_names() {
        let long = "a".repeat(100);
        let peer = PeerInfo::from_query(Some(&format!("name={long}")));
        assert_eq!(peer.display_name.map(|n| n.len()), Some(MAX_NAME_CHARS));
    }

    #[test]
    fn test_from_query_keeps_malformed_escapes_literally() {
        let peer = PeerInfo::from_query(Some("name=100%25+%zz%4"));
        assert_eq!(peer.display_name.as_deref(), Some("100% %zz%4"));
    }

    #[test]
    fn test_from_query_identity_must_be_valid_after_decoding() {
        let peer = PeerInfo::from_query(Some("id=white%2D7"));
        assert_eq!(peer.id, ConnectionId::new("white-7"));
    }

    #[test]
    fn test_from_query_ignores_pairs_without_value_and_unknown_keys() {
        let peer = PeerInfo::from_query(Some("id&name=Ann&color=w"));
        assert_eq!(peer.id.as_str().len(), 32);
        assert_eq!(peer.display_name.as_deref(), Some("Ann"));
    }
}
