//! IMAP-backed mail source.

use async_trait::async_trait;
use chrono::NaiveDate;
use mailkeep_imap::{Client, MailStream, Selected, Uid, connect_tls};
use mailkeep_mime::Message;
use tracing::{debug, warn};

use super::{MailSession, MailSource, RawAttachment, RawMessage, SourceError};
use crate::config::Config;

/// Connects to an IMAP server and reads the monitored folder.
///
/// Each [`connect`](MailSource::connect) performs a fresh
/// TLS + LOGIN + SELECT; fetches use `BODY.PEEK[]`, so polling leaves
/// server-side flags untouched.
pub struct ImapMailSource {
    host: String,
    port: u16,
    username: String,
    password: String,
    mailbox: String,
}

impl ImapMailSource {
    /// Builds a source from the service configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.imap.host.clone(),
            port: config.imap.port,
            username: config.imap.username.clone(),
            password: config.imap.password.clone(),
            mailbox: config.mailbox.clone(),
        }
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn connect(&self) -> Result<Box<dyn MailSession>, SourceError> {
        let stream = connect_tls(&self.host, self.port)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let client = Client::from_stream(stream)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let client = client
            .login(&self.username, &self.password)
            .await
            .map_err(|e| SourceError::Connection(format!("login failed: {e}")))?;
        let client = client
            .select(&self.mailbox)
            .await
            .map_err(|e| SourceError::Connection(format!("select failed: {e}")))?;

        debug!(host = %self.host, mailbox = %self.mailbox, "mailbox session opened");
        Ok(Box::new(ImapMailSession {
            client: Some(client),
        }))
    }
}

struct ImapMailSession {
    client: Option<Client<MailStream, Selected>>,
}

#[async_trait]
impl MailSession for ImapMailSession {
    async fn search_since(&mut self, floor: NaiveDate) -> Result<Vec<RawMessage>, SourceError> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| SourceError::Protocol("session already closed".to_string()))?;

        let mut uids = client
            .uid_search_since(floor)
            .await
            .map_err(|e| SourceError::Protocol(e.to_string()))?;
        // Newest first; UIDs ascend in arrival order within a folder.
        uids.sort_unstable_by(|a, b| b.cmp(a));

        let mut messages = Vec::with_capacity(uids.len());
        for uid in uids {
            let raw = client
                .uid_fetch_body(uid)
                .await
                .map_err(|e| SourceError::Protocol(e.to_string()))?;
            let Some(raw) = raw else {
                // Expunged between SEARCH and FETCH.
                debug!(%uid, "uid vanished before fetch");
                continue;
            };
            messages.push(to_raw_message(uid, &raw)?);
        }
        Ok(messages)
    }

    async fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed, dropping connection");
            }
        }
    }
}

fn to_raw_message(uid: Uid, raw: &[u8]) -> Result<RawMessage, SourceError> {
    let message =
        Message::parse(raw).map_err(|e| SourceError::Malformed(format!("uid {uid}: {e}")))?;

    let received_at = message
        .date()
        .ok_or_else(|| SourceError::Malformed(format!("uid {uid}: no parseable Date header")))?;

    let attachments = message
        .attachments()
        .map_err(|e| SourceError::Malformed(format!("uid {uid}: {e}")))?
        .into_iter()
        .map(|part| RawAttachment {
            filename: part.filename,
            content: part.content,
        })
        .collect();

    Ok(RawMessage {
        remote_id: uid.to_string(),
        sender: message.sender(),
        subject: message.subject(),
        body: message.text_body(),
        received_at,
        attachments,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn raw_message_from_rfc822() {
        let raw = b"From: billing@example.com\r\n\
                    Subject: Invoice\r\n\
                    Date: Thu, 6 Aug 2026 10:15:00 +0300\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    Amount due: 42";

        let message = to_raw_message(Uid(7), raw).unwrap();
        assert_eq!(message.remote_id, "7");
        assert_eq!(message.sender, "billing@example.com");
        assert_eq!(message.subject, "Invoice");
        assert_eq!(message.body, "Amount due: 42");
        assert!(message.attachments.is_empty());
        assert_eq!(
            message.received_at.to_rfc3339(),
            "2026-08-06T10:15:00+03:00"
        );
    }

    #[test]
    fn missing_date_is_malformed() {
        let raw = b"From: a@example.com\r\n\r\nno date";
        let err = to_raw_message(Uid(7), raw).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
