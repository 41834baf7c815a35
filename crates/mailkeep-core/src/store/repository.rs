//! SQLite-backed message and attachment repository.

use chrono::{DateTime, FixedOffset};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{
    AttachmentContent, AttachmentEntry, AttachmentId, InsertOutcome, MessageId, MessageRecord,
    NewMessage, StoreStats,
};
use crate::Result;

/// Repository for recorded messages and their attachments.
///
/// Clones share the underlying connection pool, so the ingestion worker and
/// concurrent query callers can each hold their own handle. Every operation
/// acquires a pooled connection for its own duration.
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Opens (or creates) the database at the given path.
    ///
    /// Creates the schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                remote_id TEXT NOT NULL UNIQUE,
                sender TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                received_at TEXT NOT NULL,
                has_attachment INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                content BLOB NOT NULL,
                FOREIGN KEY (message_id) REFERENCES messages (id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_received
            ON messages(received_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_attachments_message
            ON attachments(message_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a message, keyed on its remote identifier.
    ///
    /// A duplicate identifier is reported as
    /// [`InsertOutcome::AlreadyExists`] and writes nothing; the uniqueness
    /// check and the insert are one atomic statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_message(&self, message: &NewMessage) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r"
            INSERT INTO messages (remote_id, sender, subject, body, received_at, has_attachment)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(remote_id) DO NOTHING
            ",
        )
        .bind(&message.remote_id)
        .bind(&message.sender)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.received_at.to_rfc3339())
        .bind(message.has_attachment)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted(MessageId(
                result.last_insert_rowid(),
            )))
        }
    }

    /// Records an attachment under its parent message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_attachment(
        &self,
        message_id: MessageId,
        filename: &str,
        content: &[u8],
    ) -> Result<AttachmentId> {
        let result = sqlx::query(
            r"
            INSERT INTO attachments (message_id, filename, content)
            VALUES (?, ?, ?)
            ",
        )
        .bind(message_id.0)
        .bind(filename)
        .bind(content)
        .execute(&self.pool)
        .await?;

        Ok(AttachmentId(result.last_insert_rowid()))
    }

    /// Lists all messages with their attachment counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_messages(&self) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT m.id, m.sender, m.subject, m.received_at, m.has_attachment,
                   COUNT(a.id) AS attachment_count
            FROM messages m
            LEFT JOIN attachments a ON m.id = a.message_id
            GROUP BY m.id
            ORDER BY m.received_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .filter_map(|row| {
                let received_raw: String = row.get("received_at");
                let received_at = DateTime::parse_from_rfc3339(&received_raw).ok()?;

                Some(MessageRecord {
                    id: MessageId(row.get("id")),
                    sender: row.get("sender"),
                    subject: row.get("subject"),
                    received_at,
                    has_attachment: row.get::<bool, _>("has_attachment"),
                    attachment_count: row.get("attachment_count"),
                })
            })
            .collect();

        Ok(records)
    }

    /// Lists the attachments of a message. Empty when the message has none
    /// (or does not exist).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_attachments(&self, message_id: MessageId) -> Result<Vec<AttachmentEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, filename
            FROM attachments
            WHERE message_id = ?
            ORDER BY id
            ",
        )
        .bind(message_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| AttachmentEntry {
                id: AttachmentId(row.get("id")),
                filename: row.get("filename"),
            })
            .collect())
    }

    /// Fetches one attachment's filename and content.
    ///
    /// Returns `None` for an unknown id — a distinct not-found result, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_attachment(&self, id: AttachmentId) -> Result<Option<AttachmentContent>> {
        let row = sqlx::query(
            r"
            SELECT filename, content
            FROM attachments
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| AttachmentContent {
            filename: row.get("filename"),
            content: row.get("content"),
        }))
    }

    /// The latest received timestamp over all stored messages, if any.
    ///
    /// All rows carry the same fixed offset, so the textual maximum of the
    /// RFC 3339 column is the chronological maximum.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn max_received_at(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let max: Option<String> = sqlx::query_scalar("SELECT MAX(received_at) FROM messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(max.and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok()))
    }

    /// Whether a message with the given remote identifier is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn contains_remote_id(&self, remote_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE remote_id = ?")
                .bind(remote_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Aggregate counters for the stats snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(has_attachment), 0) AS with_attachments
            FROM messages
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total_messages: row.get("total"),
            with_attachments: row.get("with_attachments"),
        })
    }
}
