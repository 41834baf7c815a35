//! # mailkeep-mime
//!
//! MIME message parsing for mailkeep.
//!
//! Turns a raw RFC 822 message, as fetched off the wire, into the pieces the
//! ingestion pipeline records: decoded headers (sender, subject, date),
//! the plain-text body, and any attachments with their original bytes.
//!
//! ## Parsing a message
//!
//! ```
//! use mailkeep_mime::Message;
//!
//! let raw = b"From: sender@example.com\r\n\
//!             Subject: Test\r\n\
//!             Date: Thu, 6 Aug 2026 10:00:00 +0300\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw).unwrap();
//! assert_eq!(message.subject(), "Test");
//! assert_eq!(message.text_body(), "Hello, World!");
//! ```

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::content_type_for;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{AttachmentPart, Message, TransferEncoding};
