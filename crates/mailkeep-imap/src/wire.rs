//! Framed I/O for the IMAP protocol.
//!
//! IMAP replies are CRLF-terminated lines that may embed literals of the
//! form `{n}\r\n<n bytes>`. [`Transport`] reads whole replies with their
//! literals attached and accumulates untagged replies until the tagged
//! completion for a command arrives.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const READ_BUFFER_SIZE: usize = 8192;

/// Upper bound on a single reply line.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound on a single literal (a full message body fits well within).
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024;

/// Buffered, literal-aware transport over an IMAP connection.
pub struct Transport<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a transport over the given stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }

    /// Sends one complete command line.
    pub async fn send(&mut self, command: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(command);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads one complete reply, including any embedded literals.
    pub async fn read_reply(&mut self) -> Result<Vec<u8>> {
        let mut reply = Vec::new();

        loop {
            let line = self.read_line().await?;
            reply.extend_from_slice(&line);

            let Some(length) = literal_length(&line) else {
                return Ok(reply);
            };
            if length > MAX_LITERAL_SIZE {
                return Err(Error::Parse(format!(
                    "literal too large: {length} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let mut literal = vec![0u8; length];
            self.reader.read_exact(&mut literal).await?;
            reply.extend_from_slice(&literal);
            // The reply continues after the literal.
        }
    }

    /// Reads replies until the tagged completion for `tag`.
    ///
    /// The tagged reply is the last element of the returned list.
    pub async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut replies = Vec::new();

        loop {
            let reply = self.read_reply().await?;
            let tagged = reply
                .get(..tag.len())
                .is_some_and(|prefix| prefix == tag.as_bytes())
                && reply.get(tag.len()) == Some(&b' ');
            replies.push(reply);
            if tagged {
                return Ok(replies);
            }
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Parse("reply line too long".to_string()));
            }
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal announcement (`{n}` or `{n+}`) at the end of a line.
fn literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"+}").or_else(|| line.strip_suffix(b"}"))?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    std::str::from_utf8(&line[open + 1..]).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tokio_test::io::Builder;

    #[test]
    fn literal_length_parsing() {
        assert_eq!(literal_length(b"* 1 FETCH (BODY[] {42}\r\n"), Some(42));
        assert_eq!(literal_length(b"* 1 FETCH (BODY[] {42+}\r\n"), Some(42));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"* OK done\r\n"), None);
        assert_eq!(literal_length(b"missing crlf {5}"), None);
        assert_eq!(literal_length(b"not a number {abc}\r\n"), None);
    }

    #[tokio::test]
    async fn read_simple_reply() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut transport = Transport::new(mock);
        assert_eq!(transport.read_reply().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn read_reply_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut transport = Transport::new(mock);
        assert_eq!(
            transport.read_reply().await.unwrap(),
            b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n"
        );
    }

    #[tokio::test]
    async fn read_until_tagged_collects_untagged() {
        let mock = Builder::new()
            .read(b"* SEARCH 4 7\r\n")
            .read(b"K0000 OK SEARCH completed\r\n")
            .build();
        let mut transport = Transport::new(mock);

        let replies = transport.read_until_tagged("K0000").await.unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], b"* SEARCH 4 7\r\n");
        assert_eq!(replies[1], b"K0000 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn tag_prefix_must_be_whole_token() {
        // K00001 must not satisfy a wait for K0000.
        let mock = Builder::new()
            .read(b"K00001 OK other\r\n")
            .read(b"K0000 OK done\r\n")
            .build();
        let mut transport = Transport::new(mock);

        let replies = transport.read_until_tagged("K0000").await.unwrap();
        assert_eq!(replies.len(), 2);
    }

    #[tokio::test]
    async fn oversized_literal_rejected() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut transport = Transport::new(mock);

        let err = transport.read_reply().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn eof_is_an_error() {
        let mock = Builder::new().build();
        let mut transport = Transport::new(mock);
        assert!(transport.read_reply().await.is_err());
    }

    #[tokio::test]
    async fn send_writes_command_verbatim() {
        let mock = Builder::new().write(b"K0000 NOOP\r\n").build();
        let mut transport = Transport::new(mock);
        transport.send(b"K0000 NOOP\r\n").await.unwrap();
    }

    proptest! {
        #[test]
        fn literal_length_round_trip(n in 0usize..MAX_LITERAL_SIZE) {
            let line = format!("* 1 FETCH (BODY[] {{{n}}}\r\n");
            prop_assert_eq!(literal_length(line.as_bytes()), Some(n));
        }
    }
}
