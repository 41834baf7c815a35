//! Event sink contract for live updates.
//!
//! Sinks are fire-and-forget: no acknowledgment, no backpressure, and never
//! a blocking call, so the ingestion loop is oblivious to who is listening.
//! Absence of a consumer is modeled as [`NullSink`] rather than an
//! `Option`, keeping the loop free of "is a sink attached" branches.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Connection state of the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live session.
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Session established.
    Connected,
    /// Last connection attempt failed.
    Error,
}

impl ConnectionState {
    /// Lowercase label used in events and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a newly recorded message.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedMessage {
    /// Store-assigned id.
    pub id: i64,
    /// Remote identifier.
    pub remote_id: String,
    /// Sender address.
    pub sender: String,
    /// Subject.
    pub subject: String,
    /// Received timestamp, rendered `DD-MM-YYYY HH:MM:SS`.
    pub received: String,
    /// Number of attachments recorded with the message.
    pub attachment_count: usize,
}

/// Snapshot of store counters and loop status.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Total recorded messages.
    pub total_messages: i64,
    /// Recorded messages carrying attachments.
    pub messages_with_attachments: i64,
    /// Loop connection state at snapshot time.
    pub status: ConnectionState,
    /// Snapshot time, RFC 3339.
    pub timestamp: String,
}

/// Consumer of ingestion events.
pub trait EventSink: Send + Sync {
    /// The loop's connection state changed.
    fn connection_status(&self, state: ConnectionState, message: &str, detail: Option<&str>);

    /// A new message was recorded.
    fn message_ingested(&self, message: &IngestedMessage);

    /// Refreshed store counters after a recording.
    fn stats_snapshot(&self, stats: &StatsSnapshot);
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn connection_status(&self, _state: ConnectionState, _message: &str, _detail: Option<&str>) {}
    fn message_ingested(&self, _message: &IngestedMessage) {}
    fn stats_snapshot(&self, _stats: &StatsSnapshot) {}
}

/// Sink that logs events through `tracing`; the daemon's default.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn connection_status(&self, state: ConnectionState, message: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => info!(%state, detail, "{message}"),
            None => info!(%state, "{message}"),
        }
    }

    fn message_ingested(&self, message: &IngestedMessage) {
        info!(
            id = message.id,
            sender = %message.sender,
            subject = %message.subject,
            attachments = message.attachment_count,
            "message recorded"
        );
    }

    fn stats_snapshot(&self, stats: &StatsSnapshot) {
        debug!(
            total = stats.total_messages,
            with_attachments = stats.messages_with_attachments,
            status = %stats.status,
            "store stats"
        );
    }
}

/// A serialized ingestion event, as delivered to broadcast subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Connection state transition.
    ConnectionStatus {
        /// New state.
        state: ConnectionState,
        /// Human-readable description.
        message: String,
        /// Optional failure detail.
        detail: Option<String>,
    },
    /// A message was recorded.
    MessageIngested {
        /// Summary of the recorded message.
        message: IngestedMessage,
    },
    /// Refreshed store counters.
    StatsSnapshot {
        /// The counters.
        stats: StatsSnapshot,
    },
}

/// Sink that fans events out over a tokio broadcast channel.
///
/// `send` never blocks; with no subscribers, or with subscribers that have
/// lagged past the channel capacity, events are simply dropped — ingestion
/// correctness does not depend on delivery.
pub struct BroadcastSink {
    tx: broadcast::Sender<Event>,
}

impl BroadcastSink {
    /// Creates a sink with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes a new consumer.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl EventSink for BroadcastSink {
    fn connection_status(&self, state: ConnectionState, message: &str, detail: Option<&str>) {
        self.publish(Event::ConnectionStatus {
            state,
            message: message.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    fn message_ingested(&self, message: &IngestedMessage) {
        self.publish(Event::MessageIngested {
            message: message.clone(),
        });
    }

    fn stats_snapshot(&self, stats: &StatsSnapshot) {
        self.publish(Event::StatsSnapshot {
            stats: stats.clone(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(16);
        // Must not error or block.
        sink.connection_status(ConnectionState::Connecting, "connecting", None);
    }

    #[tokio::test]
    async fn broadcast_delivers_events() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.connection_status(ConnectionState::Connected, "connected", None);
        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            Event::ConnectionStatus {
                state: ConnectionState::Connected,
                ..
            }
        ));
    }

    #[test]
    fn event_json_shape() {
        let event = Event::MessageIngested {
            message: IngestedMessage {
                id: 1,
                remote_id: "42".to_string(),
                sender: "a@example.com".to_string(),
                subject: "Invoice".to_string(),
                received: "06-08-2026 10:15:00".to_string(),
                attachment_count: 1,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "message_ingested");
        assert_eq!(json["message"]["remote_id"], "42");
    }

    #[test]
    fn connection_state_labels() {
        assert_eq!(ConnectionState::Disconnected.as_str(), "disconnected");
        assert_eq!(ConnectionState::Error.to_string(), "error");
        let json = serde_json::to_value(ConnectionState::Connecting).unwrap();
        assert_eq!(json, "connecting");
    }
}
