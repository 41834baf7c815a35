//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 encoded headers. Only the
//! decode direction is implemented; mailkeep never generates messages.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data.
///
/// Whitespace is stripped before decoding, since encoded bodies arrive
/// wrapped at line boundaries.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Returns raw bytes; the caller decides whether they are text.
///
/// # Errors
///
/// Returns an error if the input contains an invalid escape sequence.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '=' {
            // Soft line break: "=\r\n" or "=\n"
            if chars.peek() == Some(&'\r') {
                chars.next();
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    continue;
                }
            } else if chars.peek() == Some(&'\n') {
                chars.next();
                continue;
            }

            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("invalid hex escape: {e}")))?;
                result.push(byte);
            } else {
                return Err(Error::InvalidEncoding(
                    "incomplete escape sequence".to_string(),
                ));
            }
        } else {
            let mut buf = [0u8; 4];
            result.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }

    Ok(result)
}

/// Decodes an RFC 2047 encoded header value.
///
/// Values may contain several `=?charset?encoding?text?=` words mixed with
/// plain text; each word is decoded in place. Unencoded input is returned
/// unchanged.
///
/// # Errors
///
/// Returns an error if an encoded word carries an unknown encoding or
/// undecodable payload.
pub fn decode_rfc2047(value: &str) -> Result<String> {
    if !value.contains("=?") {
        return Ok(value.to_string());
    }

    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("=?") {
        let (plain, tail) = rest.split_at(start);
        result.push_str(plain);

        // An encoded word is =?charset?encoding?text?=; locate the
        // separators structurally, since Q-encoded text may contain "?="
        // lookalikes such as "?Q?=E2".
        let inner = &tail[2..];
        let Some((_charset, encoding, text, remainder)) = split_encoded_word(inner) else {
            result.push_str(tail);
            return Ok(result);
        };

        let decoded = match encoding {
            "B" | "b" => decode_base64(text)?,
            "Q" | "q" => decode_quoted_printable(&text.replace('_', " "))?,
            other => {
                return Err(Error::InvalidEncoding(format!(
                    "unknown header encoding: {other}"
                )));
            }
        };
        result.push_str(&String::from_utf8_lossy(&decoded));

        rest = remainder;
        // Whitespace between adjacent encoded words is not significant.
        if rest.trim_start().starts_with("=?") {
            rest = rest.trim_start();
        }
    }

    result.push_str(rest);
    Ok(result)
}

/// Splits the inside of an encoded word (after the leading `=?`) into
/// charset, encoding, text, and the remainder after the closing `?=`.
fn split_encoded_word(inner: &str) -> Option<(&str, &str, &str, &str)> {
    let q1 = inner.find('?')?;
    let q2 = q1 + 1 + inner[q1 + 1..].find('?')?;
    let end = q2 + 1 + inner[q2 + 1..].find("?=")?;
    Some((
        &inner[..q1],
        &inner[q1 + 1..q2],
        &inner[q2 + 1..end],
        &inner[end + 2..],
    ))
}
