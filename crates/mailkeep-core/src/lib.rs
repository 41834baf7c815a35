//! # mailkeep-core
//!
//! The ingestion core of mailkeep: a connection-resilient polling loop that
//! records newly arrived mailbox messages and their attachments exactly once
//! in `SQLite`, and the contracts it is built on.
//!
//! This crate provides:
//! - Configuration loaded from the environment
//! - The message/attachment store (idempotent inserts, point lookups,
//!   newest-first listings) backing the query/download surface
//! - The mail-source contract and its IMAP-backed implementation
//! - The event-sink contract for optional live updates
//! - The ingestion worker: connect, fetch, watermark-filter, persist, sleep,
//!   with two-tier reconnect backoff

pub mod config;
mod error;
pub mod ingest;
pub mod sink;
pub mod source;
pub mod store;

pub use config::{Config, ImapEndpoint};
pub use error::{Error, Result};
pub use mailkeep_mime::content_type_for;
pub use ingest::{IngestHandle, IngestWorker, Watermark};
pub use sink::{
    BroadcastSink, ConnectionState, Event, EventSink, IngestedMessage, NullSink, StatsSnapshot,
    TracingSink,
};
pub use source::{ImapMailSource, MailSession, MailSource, RawAttachment, RawMessage, SourceError};
pub use store::{
    AttachmentContent, AttachmentEntry, AttachmentId, InsertOutcome, MessageId, MessageRecord,
    MessageStore, NewMessage, StoreStats,
};
