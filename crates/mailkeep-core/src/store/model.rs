//! Store data models.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Surrogate identifier of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate identifier of a stored attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttachmentId(pub i64);

impl std::fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message about to be recorded.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Remote-assigned unique identifier (the idempotency key).
    pub remote_id: String,
    /// Sender address.
    pub sender: String,
    /// Subject (may be empty).
    pub subject: String,
    /// Plain-text body (may be empty).
    pub body: String,
    /// Received timestamp, normalized to the configured fixed offset.
    pub received_at: DateTime<FixedOffset>,
    /// Whether the message carries attachments.
    pub has_attachment: bool,
}

/// Outcome of an idempotent message insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The message was recorded under the given id.
    Inserted(MessageId),
    /// A message with the same remote identifier already exists; nothing
    /// was written.
    AlreadyExists,
}

/// A stored message as returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    /// Surrogate id.
    pub id: MessageId,
    /// Sender address.
    pub sender: String,
    /// Subject.
    pub subject: String,
    /// Received timestamp.
    #[serde(serialize_with = "serialize_display_timestamp")]
    pub received_at: DateTime<FixedOffset>,
    /// Whether the message carries attachments.
    pub has_attachment: bool,
    /// Number of stored attachments.
    pub attachment_count: i64,
}

impl MessageRecord {
    /// Received timestamp rendered in the query surface's fixed format.
    #[must_use]
    pub fn received_display(&self) -> String {
        format_display_timestamp(&self.received_at)
    }
}

/// Renders a timestamp as `DD-MM-YYYY HH:MM:SS`.
#[must_use]
pub(crate) fn format_display_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%d-%m-%Y %H:%M:%S").to_string()
}

fn serialize_display_timestamp<S: serde::Serializer>(
    timestamp: &DateTime<FixedOffset>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_display_timestamp(timestamp))
}

/// An attachment as returned by per-message listings.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentEntry {
    /// Surrogate id.
    pub id: AttachmentId,
    /// Original filename.
    pub filename: String,
}

/// Full attachment content for download.
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    /// Original filename.
    pub filename: String,
    /// Raw bytes.
    pub content: Vec<u8>,
}

/// Aggregate counters over the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Total stored messages.
    pub total_messages: i64,
    /// Stored messages that carry at least one attachment.
    pub with_attachments: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_timestamp_format() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2026, 8, 6, 9, 5, 1).unwrap();
        assert_eq!(format_display_timestamp(&ts), "06-08-2026 09:05:01");
    }

    #[test]
    fn record_serializes_display_timestamp() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let record = MessageRecord {
            id: MessageId(1),
            sender: "a@example.com".to_string(),
            subject: "hi".to_string(),
            received_at: offset.with_ymd_and_hms(2026, 8, 6, 9, 5, 1).unwrap(),
            has_attachment: false,
            attachment_count: 0,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["received_at"], "06-08-2026 09:05:01");
        assert_eq!(json["id"], 1);
    }
}
