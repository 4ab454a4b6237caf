//! Encoded frames handed to client transports
//!
//! A message is serialized once per broadcast and the resulting text is
//! shared by every recipient.

use std::sync::Arc;

/// Discriminant of a wire message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Bootstrap history sent once per connection
    Snapshot,
    /// One freshly produced reading
    Update,
}

impl MessageKind {
    /// Wire name used in the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Snapshot => "snapshot",
            MessageKind::Update => "update",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded message ready to be written to a client
///
/// Cheap to clone: the JSON text is reference counted, so every recipient of
/// a broadcast reads the same immutable allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: MessageKind,
    text: Arc<str>,
}

impl Frame {
    /// Wrap already encoded JSON text
    pub fn new(kind: MessageKind, text: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Message kind carried by this frame
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// JSON text of the frame
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Size of the encoded text in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the encoded text is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_text() {
        let frame = Frame::new(MessageKind::Update, r#"{"type":"update"}"#);
        let copy = frame.clone();

        assert!(std::ptr::eq(frame.as_str(), copy.as_str()));
        assert_eq!(copy.kind(), MessageKind::Update);
        assert_eq!(copy.len(), 17);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(MessageKind::Snapshot.to_string(), "snapshot");
        assert_eq!(MessageKind::Update.as_str(), "update");
    }
}
