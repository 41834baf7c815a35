//! Mailkeep daemon: monitors a mailbox over IMAP and archives new messages
//! and their attachments to `SQLite`.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailkeep_core::{Config, ImapMailSource, IngestWorker, MessageStore, TracingSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailkeep=info,mailkeep_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store = MessageStore::new(&config.database_path)
        .await
        .context("failed to open message store")?;

    let source = Arc::new(ImapMailSource::new(&config));

    info!(
        server = %config.imap.host,
        mailbox = %config.mailbox,
        database = %config.database_path,
        "starting mailkeep"
    );

    let worker = IngestWorker::new(config, store, source, Arc::new(TracingSink));
    let handle = worker.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");

    handle.stop();
    handle.wait().await;

    Ok(())
}
