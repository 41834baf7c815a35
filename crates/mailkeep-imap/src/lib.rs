//! # mailkeep-imap
//!
//! A compact async IMAP client covering exactly what a polling ingester
//! needs: connect over TLS, LOGIN, SELECT a folder, UID SEARCH by date
//! floor, UID FETCH a full message body, LOGOUT.
//!
//! The client uses the type-state pattern so that only commands valid for
//! the current connection state are available:
//!
//! - [`NotAuthenticated`]: after the server greeting
//! - [`Authenticated`]: after LOGIN
//! - [`Selected`]: after SELECT
//!
//! Fetches use `BODY.PEEK[]`, so polling never alters flags on the server.
//!
//! ```no_run
//! use mailkeep_imap::{Client, connect_tls};
//! # async fn run() -> mailkeep_imap::Result<()> {
//! let stream = connect_tls("imap.example.com", 993).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.login("user@example.com", "password").await?;
//! let mut client = client.select("INBOX").await?;
//!
//! let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
//! for uid in client.uid_search_since(date).await? {
//!     if let Some(raw) = client.uid_fetch_body(uid).await? {
//!         println!("fetched {} bytes for uid {uid}", raw.len());
//!     }
//! }
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod stream;
mod tag;
mod wire;

pub use client::{Authenticated, Client, NotAuthenticated, Selected, Uid};
pub use error::{Error, Result};
pub use stream::{MailStream, connect_plain, connect_tls};
