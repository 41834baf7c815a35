//! The ingestion loop.
//!
//! One worker owns the whole loop state — session, connection state,
//! failure counter, watermark — and runs as a single tokio task. Each cycle
//! is: connection guard, fetch candidates since the watermark's date,
//! filter by strict timestamp and stored identifier, persist survivors,
//! sleep. Failures never escape a cycle; they flip the connection state and
//! shorten the next sleep.

mod watermark;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::Config;
use crate::sink::{ConnectionState, EventSink, IngestedMessage, StatsSnapshot};
use crate::source::{MailSession, MailSource};
use crate::store::{InsertOutcome, MessageStore, NewMessage, format_display_timestamp};

pub use watermark::Watermark;

/// The polling worker. Construct with [`IngestWorker::new`], then either
/// [`spawn`](IngestWorker::spawn) it onto a task or drive
/// [`run`](IngestWorker::run) directly.
pub struct IngestWorker {
    config: Config,
    store: MessageStore,
    source: Arc<dyn MailSource>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    session: Option<Box<dyn MailSession>>,
    state: ConnectionState,
    failures: u32,
    watermark: Option<Watermark>,
}

/// Handle to a spawned worker: request a stop, then await completion.
pub struct IngestHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl IngestHandle {
    /// Requests a stop. The loop observes it at the next iteration
    /// boundary, so latency is bounded by one in-flight call plus cleanup.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Waits for the worker to finish shutting down.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

impl IngestWorker {
    /// Creates a worker over the given store, source and sink.
    #[must_use]
    pub fn new(
        config: Config,
        store: MessageStore,
        source: Arc<dyn MailSource>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            store,
            source,
            sink,
            cancel: CancellationToken::new(),
            session: None,
            state: ConnectionState::Disconnected,
            failures: 0,
            watermark: None,
        }
    }

    /// Spawns the worker onto its own task.
    #[must_use]
    pub fn spawn(self) -> IngestHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        IngestHandle { cancel, task }
    }

    /// Runs the loop until the stop signal fires.
    pub async fn run(mut self) {
        info!(mailbox = %self.config.mailbox, "mailbox monitoring started");

        while !self.cancel.is_cancelled() {
            let pause = self.cycle().await;
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        self.drop_session().await;
        self.set_state(ConnectionState::Disconnected, "monitoring stopped", None);
        info!("mailbox monitoring stopped");
    }

    /// One iteration: connection guard, then check the mailbox. Returns how
    /// long to sleep before the next iteration.
    async fn cycle(&mut self) -> Duration {
        if self.session.is_none() && !self.connect().await {
            if self.failures >= self.config.max_retries {
                warn!(
                    retries = self.failures,
                    backoff_secs = self.config.backoff_delay.as_secs(),
                    "connection retries exhausted, backing off"
                );
                self.failures = 0;
                return self.config.backoff_delay;
            }
            return self.config.retry_delay;
        }

        match self.check_mailbox().await {
            Ok(0) => {
                debug!("no new messages");
                self.config.check_interval
            }
            Ok(count) => {
                info!(count, "recorded new messages");
                self.config.check_interval
            }
            Err(e) => {
                warn!(error = %e, "mailbox check failed, reconnecting next cycle");
                self.drop_session().await;
                self.set_state(
                    ConnectionState::Disconnected,
                    "mailbox check failed",
                    Some(&e.to_string()),
                );
                self.config.retry_delay
            }
        }
    }

    async fn connect(&mut self) -> bool {
        self.set_state(ConnectionState::Connecting, "connecting to mail source", None);
        match self.source.connect().await {
            Ok(session) => {
                self.session = Some(session);
                self.failures = 0;
                self.set_state(ConnectionState::Connected, "connected to mail source", None);
                true
            }
            Err(e) => {
                self.failures += 1;
                warn!(attempt = self.failures, error = %e, "connection attempt failed");
                self.set_state(
                    ConnectionState::Error,
                    "connection attempt failed",
                    Some(&e.to_string()),
                );
                false
            }
        }
    }

    /// Fetches candidates, filters them against the watermark and the
    /// store, and persists the survivors. Returns how many were recorded.
    async fn check_mailbox(&mut self) -> Result<usize> {
        if self.watermark.is_none() {
            let derived = Watermark::derive(&self.store, self.config.now()).await?;
            info!(watermark = %derived.current(), "watermark initialized");
            self.watermark = Some(derived);
        }
        // Filter against the watermark as it stood at cycle entry; advances
        // below must not hide older messages later in the same batch.
        let Some(snapshot) = self.watermark else {
            return Ok(0);
        };
        let floor = snapshot.current();

        let candidates = {
            let Some(session) = self.session.as_mut() else {
                return Ok(0);
            };
            session.search_since(snapshot.floor_date()).await?
        };
        debug!(candidates = candidates.len(), floor = %floor, "mailbox checked");

        let mut recorded = 0;
        for message in candidates {
            let received = message.received_at.with_timezone(&self.config.utc_offset);
            if received <= floor {
                continue;
            }
            if self.store.contains_remote_id(&message.remote_id).await? {
                debug!(remote_id = %message.remote_id, "already recorded, skipping");
                continue;
            }

            let outcome = self
                .store
                .insert_message(&NewMessage {
                    remote_id: message.remote_id.clone(),
                    sender: message.sender.clone(),
                    subject: message.subject.clone(),
                    body: message.body.clone(),
                    received_at: received,
                    has_attachment: !message.attachments.is_empty(),
                })
                .await?;

            let id = match outcome {
                InsertOutcome::AlreadyExists => {
                    debug!(remote_id = %message.remote_id, "duplicate identifier, skipping");
                    continue;
                }
                InsertOutcome::Inserted(id) => id,
            };

            for attachment in &message.attachments {
                self.store
                    .insert_attachment(id, &attachment.filename, &attachment.content)
                    .await?;
            }

            info!(
                %id,
                remote_id = %message.remote_id,
                subject = %message.subject,
                attachments = message.attachments.len(),
                "message recorded"
            );
            self.sink.message_ingested(&IngestedMessage {
                id: id.0,
                remote_id: message.remote_id,
                sender: message.sender,
                subject: message.subject,
                received: format_display_timestamp(&received),
                attachment_count: message.attachments.len(),
            });
            let stats = self.store.stats().await?;
            self.sink.stats_snapshot(&StatsSnapshot {
                total_messages: stats.total_messages,
                messages_with_attachments: stats.with_attachments,
                status: self.state,
                timestamp: self.config.now().to_rfc3339(),
            });

            if let Some(watermark) = self.watermark.as_mut() {
                watermark.advance(received);
            }
            recorded += 1;
        }

        Ok(recorded)
    }

    async fn drop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect().await;
        }
    }

    fn set_state(&mut self, state: ConnectionState, message: &str, detail: Option<&str>) {
        self.state = state;
        self.sink.connection_status(state, message, detail);
    }
}
