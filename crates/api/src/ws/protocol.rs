//! Wire format for the `/ws` channel.
//!
//! Client → server: `{"action": "subscribe" | "unsubscribe", "event_name": "..."}`.
//! Server → client: acknowledgements, error frames, and event pushes.

use axum::extract::ws::Message;
use serde::Serialize;

/// A well-formed control frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Subscribe(String),
    Unsubscribe(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid action or missing event_name")]
    InvalidAction,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;

        let action = value.get("action").and_then(|v| v.as_str());
        let event_name = value
            .get("event_name")
            .and_then(|v| v.as_str())
            .filter(|name| !name.is_empty());

        match (action, event_name) {
            (Some("subscribe"), Some(name)) => Ok(ClientFrame::Subscribe(name.to_string())),
            (Some("unsubscribe"), Some(name)) => Ok(ClientFrame::Unsubscribe(name.to_string())),
            _ => Err(ProtocolError::InvalidAction),
        }
    }
}

/// Frames the server sends. Each variant serializes to a flat JSON object.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ServerFrame<'a> {
    Subscribed {
        subscribed: &'a str,
    },
    Unsubscribed {
        unsubscribed: &'a str,
    },
    Error {
        error: String,
    },
    Event {
        event_name: &'a str,
        payload: &'a serde_json::Value,
    },
}

impl ServerFrame<'_> {
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(text.into()))
    }
}

impl From<ProtocolError> for ServerFrame<'static> {
    fn from(err: ProtocolError) -> Self {
        ServerFrame::Error {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn parses_subscribe_and_unsubscribe() {
        assert_eq!(
            ClientFrame::parse(r#"{"action":"subscribe","event_name":"order.created"}"#),
            Ok(ClientFrame::Subscribe("order.created".into()))
        );
        assert_eq!(
            ClientFrame::parse(r#"{"action":"unsubscribe","event_name":"order.created"}"#),
            Ok(ClientFrame::Unsubscribe("order.created".into()))
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert_matches!(ClientFrame::parse("{not json"), Err(ProtocolError::InvalidJson));
    }

    #[test]
    fn rejects_unknown_action_and_missing_name() {
        for frame in [
            r#"{"action":"publish","event_name":"x"}"#,
            r#"{"action":"subscribe"}"#,
            r#"{"action":"subscribe","event_name":""}"#,
            r#"{"action":"subscribe","event_name":42}"#,
            r#"{"event_name":"x"}"#,
            r#"["subscribe","x"]"#,
        ] {
            assert_matches!(ClientFrame::parse(frame), Err(ProtocolError::InvalidAction), "{frame}");
        }
    }

    #[test]
    fn server_frames_serialize_flat() {
        assert_eq!(
            text(ServerFrame::Subscribed { subscribed: "a" }.to_message().unwrap()),
            json!({"subscribed": "a"})
        );
        assert_eq!(
            text(ServerFrame::Unsubscribed { unsubscribed: "a" }.to_message().unwrap()),
            json!({"unsubscribed": "a"})
        );
        assert_eq!(
            text(ServerFrame::from(ProtocolError::InvalidJson).to_message().unwrap()),
            json!({"error": "Invalid JSON"})
        );

        let payload = json!({"id": 42});
        assert_eq!(
            text(
                ServerFrame::Event {
                    event_name: "job.done",
                    payload: &payload
                }
                .to_message()
                .unwrap()
            ),
            json!({"event_name": "job.done", "payload": {"id": 42}})
        );
    }
}
