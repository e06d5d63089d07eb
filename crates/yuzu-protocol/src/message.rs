//! Wire messages between the server and its clients.
//!
//! All messages are JSON-serialized strings with a `type` tag. The stream is
//! one-way apart from the handshake: clients only ever request the full state,
//! servers answer with snapshots and push incremental changes.
//!
//! Inbound parsing is tolerant: a message whose `type` is unknown is ignored
//! (answered with `Ok(None)`), while a malformed payload is an error for the
//! caller to log and discard. Neither closes the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use yuzu_state::Patch;

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload was not valid JSON or did not match the message shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload was valid JSON but not an object with a `type` tag.
    #[error("message has no type tag")]
    MissingType,
}

/// Messages a client sends to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Request the full state snapshot.
    Complete,
}

/// Messages the server sends to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Full snapshot reply, sent only to the requesting client.
    Complete {
        /// The entire state tree at service time.
        state: Value,
    },
    /// One incremental change, broadcast.
    Patch {
        /// The change to apply.
        patch: Patch,
    },
    /// Ordered incremental changes, broadcast, applied atomically from the
    /// client's perspective.
    PatchBatch {
        /// The changes, in write order.
        patches: Vec<Patch>,
    },
}

impl ClientMessage {
    /// Serialize to the wire form.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerMessage {
    /// Serialize to the wire form.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse an inbound client message. `Ok(None)` means an unknown type to be
/// ignored.
pub fn parse_client_message(raw: &str) -> Result<Option<ClientMessage>, ProtocolError> {
    parse_tolerant(raw)
}

/// Parse an inbound server message. `Ok(None)` means an unknown type to be
/// ignored.
pub fn parse_server_message(raw: &str) -> Result<Option<ServerMessage>, ProtocolError> {
    parse_tolerant(raw)
}

fn parse_tolerant<T: for<'de> Deserialize<'de> + TaggedMessage>(
    raw: &str,
) -> Result<Option<T>, ProtocolError> {
    let value: Value = serde_json::from_str(raw)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if !T::KNOWN_TYPES.contains(&tag) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

trait TaggedMessage {
    const KNOWN_TYPES: &'static [&'static str];
}

impl TaggedMessage for ClientMessage {
    const KNOWN_TYPES: &'static [&'static str] = &["complete"];
}

impl TaggedMessage for ServerMessage {
    const KNOWN_TYPES: &'static [&'static str] = &["complete", "patch", "patch-batch"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yuzu_state::path;

    #[test]
    fn test_complete_request_wire_form() {
        let wire = ClientMessage::Complete.encode().unwrap();
        assert_eq!(wire, r#"{"type":"complete"}"#);
    }

    #[test]
    fn test_complete_reply_roundtrip() {
        let msg = ServerMessage::Complete {
            state: json!({"count": 42, "name": "test"}),
        };
        let wire = msg.encode().unwrap();
        let parsed = parse_server_message(&wire).unwrap().unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_patch_message_wire_form() {
        let msg = ServerMessage::Patch {
            patch: Patch::set(path!("count"), json!(5)),
        };
        assert_eq!(
            msg.encode().unwrap(),
            r#"{"type":"patch","patch":{"path":["count"],"value":5}}"#
        );
    }

    #[test]
    fn test_patch_batch_roundtrip() {
        let msg = ServerMessage::PatchBatch {
            patches: vec![
                Patch::set(path!("count"), json!(1)),
                Patch::set(path!("value"), json!(2)),
                Patch::absent(path!("old")),
            ],
        };
        let wire = msg.encode().unwrap();
        let parsed = parse_server_message(&wire).unwrap().unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_unknown_type_ignored() {
        assert_eq!(
            parse_server_message(r#"{"type":"presence","who":"x"}"#).unwrap(),
            None
        );
        assert_eq!(
            parse_client_message(r#"{"type":"edit","path":[]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_json_errors() {
        assert!(parse_server_message("not json").is_err());
        assert!(parse_client_message("[1,2,3").is_err());
    }

    #[test]
    fn test_known_type_with_bad_fields_errors() {
        // Right tag, wrong shape: malformed, not ignorable.
        assert!(parse_server_message(r#"{"type":"patch","patch":5}"#).is_err());
        assert!(parse_server_message(r#"{"type":"patch-batch"}"#).is_err());
    }

    #[test]
    fn test_missing_type_tag_errors() {
        let err = parse_server_message(r#"{"state":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingType));
    }

    #[test]
    fn test_complete_with_null_state() {
        let parsed = parse_server_message(r#"{"type":"complete","state":null}"#)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, ServerMessage::Complete { state: Value::Null });
    }
}
