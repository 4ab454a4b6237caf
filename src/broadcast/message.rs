//! Wire messages
//!
//! `{"type": "snapshot" | "update", "data": ...}` as sent to clients.

use serde::{Deserialize, Serialize};

use crate::data::Reading;
use crate::error::Result;
use crate::registry::{Frame, MessageKind};

/// Message envelope sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Message {
    /// Recent history, oldest to newest, sent once per connection
    Snapshot(Vec<Reading>),
    /// One newly produced reading
    Update(Reading),
}

impl Message {
    /// Discriminant of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Snapshot(_) => MessageKind::Snapshot,
            Message::Update(_) => MessageKind::Update,
        }
    }

    /// Serialize into an immutable frame shared by all recipients
    pub fn encode(&self) -> Result<Frame> {
        let text = serde_json::to_string(self)?;
        Ok(Frame::new(self.kind(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::reading_at;

    #[test]
    fn test_update_shape() {
        let frame = Message::Update(reading_at(0).with_id(5)).encode().unwrap();
        assert_eq!(frame.kind(), MessageKind::Update);

        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["data"]["id"], 5);
        assert_eq!(value["data"]["temperature"], 21.5);
        assert!(value["data"]["timestamp"].is_string());
    }

    #[test]
    fn test_snapshot_shape() {
        let readings = vec![reading_at(0), reading_at(1)];
        let frame = Message::Snapshot(readings.clone()).encode().unwrap();
        assert_eq!(frame.kind(), MessageKind::Snapshot);

        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["data"].as_array().unwrap().len(), 2);

        let decoded: Message = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(decoded, Message::Snapshot(readings));
    }

    #[test]
    fn test_empty_snapshot() {
        let frame = Message::Snapshot(Vec::new()).encode().unwrap();
        assert_eq!(frame.as_str(), r#"{"type":"snapshot","data":[]}"#);
    }
}
