//! Type-state IMAP client.
//!
//! The type parameter tracks the connection state at compile time, so a
//! SEARCH cannot be issued before SELECT and LOGIN cannot run twice. State
//! transitions consume the client and return it in the next state.

use std::marker::PhantomData;

use chrono::{Datelike, NaiveDate};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::tag::TagGenerator;
use crate::wire::Transport;
use crate::{Error, Result};

/// State before LOGIN.
pub struct NotAuthenticated;

/// State after LOGIN, before SELECT.
pub struct Authenticated;

/// State after SELECT; search and fetch are available.
pub struct Selected;

/// A message UID within the selected folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub u32);

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IMAP client connection.
pub struct Client<S, State> {
    transport: Transport<S>,
    tags: TagGenerator,
    _state: PhantomData<State>,
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            transport: self.transport,
            tags: self.tags,
            _state: PhantomData,
        }
    }

    async fn command(&mut self, body: &str) -> Result<Vec<Vec<u8>>> {
        let tag = self.tags.next();
        debug!(%tag, command = body.split(' ').next().unwrap_or(body), "sending command");
        self.transport
            .send(format!("{tag} {body}\r\n").as_bytes())
            .await?;
        let replies = self.transport.read_until_tagged(&tag).await?;
        check_tagged_ok(&replies, &tag)?;
        Ok(replies)
    }

    /// Sends LOGOUT and drops the connection.
    ///
    /// Valid in every state; the server replies BYE followed by the tagged
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the connection is gone.
    pub async fn logout(mut self) -> Result<()> {
        self.command("LOGOUT").await?;
        Ok(())
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a freshly connected stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is BYE or unrecognizable.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut transport = Transport::new(stream);
        let greeting = transport.read_reply().await?;

        if greeting.starts_with(b"* OK") || greeting.starts_with(b"* PREAUTH") {
            Ok(Self {
                transport,
                tags: TagGenerator::default(),
                _state: PhantomData,
            })
        } else if greeting.starts_with(b"* BYE") {
            Err(Error::Bye(reply_text(&greeting, "* BYE")))
        } else {
            Err(Error::Parse(format!(
                "unexpected greeting: {}",
                String::from_utf8_lossy(&greeting).trim()
            )))
        }
    }

    /// Authenticates with LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when the server rejects the credentials.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let body = format!("LOGIN {} {}", quoted(username), quoted(password));
        match self.command(&body).await {
            Ok(_) => Ok(self.into_state()),
            Err(Error::No(message)) => Err(Error::Auth(message)),
            Err(other) => Err(other),
        }
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a folder for searching and fetching.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be selected.
    pub async fn select(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        self.command(&format!("SELECT {}", quoted(mailbox))).await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns UIDs of messages received on or after the given date.
    ///
    /// SINCE is date-granular on the server side; callers needing a finer
    /// boundary filter the results themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the reply is malformed.
    pub async fn uid_search_since(&mut self, floor: NaiveDate) -> Result<Vec<Uid>> {
        let replies = self
            .command(&format!("UID SEARCH SINCE {}", imap_date(floor)))
            .await?;

        let mut uids = Vec::new();
        for reply in &replies {
            let Some(rest) = reply.strip_prefix(b"* SEARCH") else {
                continue;
            };
            for token in String::from_utf8_lossy(rest).split_whitespace() {
                let value = token
                    .parse()
                    .map_err(|_| Error::Parse(format!("bad uid in SEARCH reply: {token}")))?;
                uids.push(Uid(value));
            }
        }
        Ok(uids)
    }

    /// Fetches the full raw message body for a UID, without touching flags.
    ///
    /// Returns `None` when the server sends no FETCH data (the message was
    /// expunged between SEARCH and FETCH).
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn uid_fetch_body(&mut self, uid: Uid) -> Result<Option<Vec<u8>>> {
        let replies = self
            .command(&format!("UID FETCH {uid} (UID BODY.PEEK[])"))
            .await?;

        for reply in &replies {
            if reply.starts_with(b"* ") && contains(reply, b" FETCH ") {
                if let Some(body) = extract_literal(reply) {
                    return Ok(Some(body));
                }
            }
        }
        Ok(None)
    }
}

/// Checks the tagged completion reply, mapping NO and BAD to errors.
fn check_tagged_ok(replies: &[Vec<u8>], tag: &str) -> Result<()> {
    let tagged = replies
        .last()
        .ok_or_else(|| Error::Parse("no reply received".to_string()))?;
    let line = String::from_utf8_lossy(tagged);
    let status = line
        .strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| Error::Parse(format!("missing tagged reply: {}", line.trim())))?
        .trim_end();

    if status.starts_with("OK") {
        Ok(())
    } else if let Some(message) = status.strip_prefix("NO") {
        Err(Error::No(message.trim().to_string()))
    } else if let Some(message) = status.strip_prefix("BAD") {
        Err(Error::Bad(message.trim().to_string()))
    } else {
        Err(Error::Parse(format!(
            "unrecognized tagged reply: {}",
            line.trim()
        )))
    }
}

/// Extracts the first literal's bytes from a reply.
fn extract_literal(reply: &[u8]) -> Option<Vec<u8>> {
    let open = reply.iter().position(|&b| b == b'{')?;
    let close = open + reply[open..].iter().position(|&b| b == b'}')?;
    let length: usize = std::str::from_utf8(&reply[open + 1..close])
        .ok()?
        .trim_end_matches('+')
        .parse()
        .ok()?;

    let start = close + 3; // skip "}\r\n"
    reply.get(start..start + length).map(<[u8]>::to_vec)
}

/// Quotes a string argument, escaping backslashes and double quotes.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Formats a date the way IMAP SEARCH expects: `6-Aug-2026`.
fn imap_date(date: NaiveDate) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    format!(
        "{}-{}-{}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

fn reply_text(reply: &[u8], prefix: &str) -> String {
    String::from_utf8_lossy(reply)
        .trim_start_matches(prefix)
        .trim()
        .to_string()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
