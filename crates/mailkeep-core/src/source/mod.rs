//! Mail source contract.
//!
//! The ingestion loop consumes a mailbox through these traits; the IMAP
//! implementation lives in [`imap`], and tests script their own.

mod imap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;

pub use imap::ImapMailSource;

/// Errors a mail source can surface to the loop.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connecting or authenticating failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An established session failed mid-operation.
    #[error("session failure: {0}")]
    Protocol(String),

    /// A fetched message could not be interpreted.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// An attachment as delivered by the source.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    /// Declared filename (may be empty, may collide).
    pub filename: String,
    /// Raw bytes.
    pub content: Vec<u8>,
}

/// A message as delivered by the source, before normalization.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Remote-assigned unique identifier.
    pub remote_id: String,
    /// Sender address.
    pub sender: String,
    /// Subject (may be empty).
    pub subject: String,
    /// Plain-text body (may be empty).
    pub body: String,
    /// Received timestamp in the source's UTC offset.
    pub received_at: DateTime<FixedOffset>,
    /// Attachments.
    pub attachments: Vec<RawAttachment>,
}

/// Factory for mailbox sessions.
///
/// One `connect` call corresponds to one login + folder selection; the loop
/// reconnects by calling it again after dropping a failed session.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Opens a session on the monitored folder.
    async fn connect(&self) -> Result<Box<dyn MailSession>, SourceError>;
}

/// An open mailbox session.
#[async_trait]
pub trait MailSession: Send {
    /// Returns messages received on or after the given calendar date,
    /// newest first.
    ///
    /// The date floor is server-side and date-granular; the caller applies
    /// its own finer timestamp filter.
    async fn search_since(&mut self, floor: NaiveDate) -> Result<Vec<RawMessage>, SourceError>;

    /// Closes the session, best-effort.
    ///
    /// Logout failures are swallowed: a session being torn down cannot do
    /// anything useful with them, and shutdown must never propagate one.
    async fn disconnect(&mut self);
}
