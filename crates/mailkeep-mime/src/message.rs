//! Raw RFC 822 message parsing.
//!
//! A fetched message is split into its header block and body, multipart
//! bodies are unwrapped into leaf parts, and attachments are extracted with
//! their transfer encoding undone.

use chrono::{DateTime, FixedOffset};

use crate::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Multipart nesting depth limit; deeper structures are treated as opaque.
const MAX_NESTING: usize = 8;

/// Transfer encoding of a message part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII (the default).
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64.
    Base64,
    /// Quoted-Printable.
    QuotedPrintable,
    /// Raw binary.
    Binary,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding header value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

/// A decoded attachment extracted from a message.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    /// Original filename as declared by the sender (may be empty).
    pub filename: String,
    /// Decoded binary content.
    pub content: Vec<u8>,
}

/// A leaf part of a (possibly multipart) message.
#[derive(Debug, Clone)]
struct Part {
    headers: Headers,
    body: Vec<u8>,
}

impl Part {
    fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::QuotedPrintable => {
                decode_quoted_printable(&String::from_utf8_lossy(&self.body))
            }
            _ => Ok(self.body.clone()),
        }
    }

    fn content_type(&self) -> String {
        self.headers
            .get("content-type")
            .unwrap_or("text/plain")
            .split(';')
            .next()
            .unwrap_or("text/plain")
            .trim()
            .to_lowercase()
    }

    /// Filename from Content-Disposition, falling back to the Content-Type
    /// `name` parameter. Presence of a filename is what marks a part as an
    /// attachment.
    fn filename(&self) -> Option<String> {
        let from_disposition = self
            .headers
            .get("content-disposition")
            .and_then(|v| header_param(v, "filename"));
        let raw = from_disposition.or_else(|| {
            self.headers
                .get("content-type")
                .and_then(|v| header_param(v, "name"))
        })?;
        Some(decode_rfc2047(&raw).unwrap_or(raw))
    }
}

/// A parsed message.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    parts: Vec<Part>,
}

impl Message {
    /// Parses a raw RFC 822 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Parse("empty message".to_string()));
        }

        let (header_block, body) = split_header_block(raw);
        let headers = Headers::parse(&header_block);

        let mut parts = Vec::new();
        collect_leaves(&headers, body, &mut parts, 0);

        Ok(Self { headers, parts })
    }

    /// Sender, from the From header, with encoded words decoded.
    #[must_use]
    pub fn sender(&self) -> String {
        self.headers.get_decoded("from").unwrap_or_default()
    }

    /// Subject, with encoded words decoded. Empty when absent.
    #[must_use]
    pub fn subject(&self) -> String {
        self.headers.get_decoded("subject").unwrap_or_default()
    }

    /// Message-ID header with angle brackets trimmed, when present.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.headers
            .get("message-id")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    }

    /// Sent date from the Date header, in the sender's UTC offset.
    ///
    /// Returns `None` when the header is missing or unparseable.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.headers.get("date")?;
        // Strip an optional trailing comment such as "(UTC)".
        let cleaned = raw
            .split_once('(')
            .map_or(raw, |(before, _)| before)
            .trim();
        DateTime::parse_from_rfc2822(cleaned).ok()
    }

    /// The plain-text body: the first `text/plain` leaf that is not an
    /// attachment. Empty when the message has none.
    #[must_use]
    pub fn text_body(&self) -> String {
        self.parts
            .iter()
            .find(|p| p.content_type() == "text/plain" && p.filename().is_none())
            .and_then(|p| p.decode_body().ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    /// All attachments, with transfer encoding decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment body fails to decode.
    pub fn attachments(&self) -> Result<Vec<AttachmentPart>> {
        let mut attachments = Vec::new();
        for part in &self.parts {
            if let Some(filename) = part.filename() {
                attachments.push(AttachmentPart {
                    filename,
                    content: part.decode_body()?,
                });
            }
        }
        Ok(attachments)
    }
}

/// Splits a raw message or part at the first blank line.
fn split_header_block(raw: &[u8]) -> (String, &[u8]) {
    if let Some(pos) = find_from(raw, b"\r\n\r\n", 0) {
        (
            String::from_utf8_lossy(&raw[..pos]).into_owned(),
            &raw[pos + 4..],
        )
    } else if let Some(pos) = find_from(raw, b"\n\n", 0) {
        (
            String::from_utf8_lossy(&raw[..pos]).into_owned(),
            &raw[pos + 2..],
        )
    } else {
        (String::from_utf8_lossy(raw).into_owned(), &[])
    }
}

/// Recursively unwraps multipart bodies into leaf parts.
fn collect_leaves(headers: &Headers, body: &[u8], leaves: &mut Vec<Part>, depth: usize) {
    let content_type = headers.get("content-type").unwrap_or("text/plain");
    let is_multipart = content_type
        .trim_start()
        .get(..10)
        .is_some_and(|p| p.eq_ignore_ascii_case("multipart/"));

    if is_multipart && depth < MAX_NESTING {
        if let Some(boundary) = header_param(content_type, "boundary") {
            for raw_part in split_multipart(body, &boundary) {
                let (header_block, part_body) = split_header_block(raw_part);
                let part_headers = Headers::parse(&header_block);
                collect_leaves(&part_headers, part_body, leaves, depth + 1);
            }
            return;
        }
    }

    leaves.push(Part {
        headers: headers.clone(),
        body: body.to_vec(),
    });
}

/// Splits a multipart body into its raw parts, byte-exact.
///
/// Delimiter lines are `--boundary` at the start of a line; the terminal
/// `--boundary--` ends the scan. The CRLF preceding a delimiter belongs to
/// the delimiter, not the part.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delim = format!("--{boundary}");
    let delim = delim.as_bytes();

    let mut parts = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut cursor = 0;

    while let Some(pos) = find_from(body, delim, cursor) {
        if pos != 0 && body[pos - 1] != b'\n' {
            cursor = pos + delim.len();
            continue;
        }

        if let Some(start) = current_start.take() {
            let mut end = pos;
            if end > start && body[end - 1] == b'\n' {
                end -= 1;
            }
            if end > start && body[end - 1] == b'\r' {
                end -= 1;
            }
            parts.push(&body[start..end]);
        }

        let after = pos + delim.len();
        if body.get(after..after + 2) == Some(b"--".as_slice()) {
            break;
        }

        match find_from(body, b"\n", after) {
            Some(newline) => {
                current_start = Some(newline + 1);
                cursor = newline + 1;
            }
            None => break,
        }
    }

    // Tolerate a missing terminal delimiter.
    if let Some(start) = current_start {
        parts.push(&body[start..]);
    }

    parts
}

/// Extracts a parameter value from a structured header such as
/// `Content-Type: multipart/mixed; boundary="xyz"`.
fn header_param(value: &str, name: &str) -> Option<String> {
    for segment in value.split(';').skip(1) {
        let Some((key, val)) = segment.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case(name) {
            return Some(val.trim().trim_matches('"').to_string());
        }
    }
    None
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn simple_message() -> Vec<u8> {
        b"From: sender@example.com\r\n\
          Subject: Invoice\r\n\
          Date: Thu, 6 Aug 2026 10:15:00 +0300\r\n\
          Message-ID: <abc@mail.example.com>\r\n\
          Content-Type: text/plain; charset=utf-8\r\n\
          \r\n\
          Please find the invoice attached."
            .to_vec()
    }

    fn multipart_message(payload: &[u8]) -> Vec<u8> {
        let encoded = STANDARD.encode(payload);
        format!(
            "From: billing@example.com\r\n\
             Subject: Invoice\r\n\
             Date: Thu, 6 Aug 2026 10:15:00 +0300\r\n\
             Content-Type: multipart/mixed; boundary=\"frontier\"\r\n\
             \r\n\
             --frontier\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             See attachment.\r\n\
             --frontier\r\n\
             Content-Type: application/pdf; name=\"inv.pdf\"\r\n\
             Content-Disposition: attachment; filename=\"inv.pdf\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {encoded}\r\n\
             --frontier--\r\n"
        )
        .into_bytes()
    }

    #[test]
    fn parse_single_part() {
        let message = Message::parse(&simple_message()).unwrap();
        assert_eq!(message.sender(), "sender@example.com");
        assert_eq!(message.subject(), "Invoice");
        assert_eq!(message.message_id().unwrap(), "abc@mail.example.com");
        assert_eq!(message.text_body(), "Please find the invoice attached.");
        assert!(message.attachments().unwrap().is_empty());
    }

    #[test]
    fn parse_date_with_offset() {
        let message = Message::parse(&simple_message()).unwrap();
        let date = message.date().unwrap();
        assert_eq!(date.to_rfc3339(), "2026-08-06T10:15:00+03:00");
    }

    #[test]
    fn parse_date_with_trailing_comment() {
        let raw = b"Date: Thu, 6 Aug 2026 07:15:00 +0000 (UTC)\r\n\r\nbody";
        let message = Message::parse(raw).unwrap();
        assert!(message.date().is_some());
    }

    #[test]
    fn missing_date_is_none() {
        let message = Message::parse(b"Subject: no date\r\n\r\nbody").unwrap();
        assert!(message.date().is_none());
    }

    #[test]
    fn attachment_round_trip() {
        let payload = b"%PDF-1.4...";
        let message = Message::parse(&multipart_message(payload)).unwrap();

        assert_eq!(message.text_body(), "See attachment.");

        let attachments = message.attachments().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "inv.pdf");
        assert_eq!(attachments[0].content, payload);
    }

    #[test]
    fn binary_attachment_preserved_byte_exact() {
        let payload: Vec<u8> = (0..=255).collect();
        let message = Message::parse(&multipart_message(&payload)).unwrap();
        assert_eq!(message.attachments().unwrap()[0].content, payload);
    }

    #[test]
    fn nested_multipart_alternative() {
        let raw = b"Content-Type: multipart/mixed; boundary=outer\r\n\
                    \r\n\
                    --outer\r\n\
                    Content-Type: multipart/alternative; boundary=inner\r\n\
                    \r\n\
                    --inner\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    plain text\r\n\
                    --inner\r\n\
                    Content-Type: text/html\r\n\
                    \r\n\
                    <p>html</p>\r\n\
                    --inner--\r\n\
                    --outer--\r\n";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.text_body(), "plain text");
    }

    #[test]
    fn quoted_printable_body() {
        let raw = b"Content-Type: text/plain\r\n\
                    Content-Transfer-Encoding: quoted-printable\r\n\
                    \r\n\
                    H=C3=A9llo";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.text_body(), "Héllo");
    }

    #[test]
    fn rfc2047_subject_decoded() {
        let raw = b"Subject: =?utf-8?B?SMOpbGxv?=\r\n\r\nbody";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject(), "Héllo");
    }

    #[test]
    fn empty_input_rejected() {
        assert!(Message::parse(b"").is_err());
    }

    #[test]
    fn missing_terminal_boundary_tolerated() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\
                    \r\n\
                    --b\r\n\
                    Content-Type: text/plain\r\n\
                    \r\n\
                    unterminated";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.text_body(), "unterminated");
    }

    #[test]
    fn header_param_extraction() {
        assert_eq!(
            header_param("multipart/mixed; boundary=\"xyz\"", "boundary").unwrap(),
            "xyz"
        );
        assert_eq!(
            header_param("attachment; filename=report.csv", "filename").unwrap(),
            "report.csv"
        );
        assert!(header_param("text/plain", "boundary").is_none());
    }
}
