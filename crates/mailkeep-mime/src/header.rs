//! Message header handling.

use std::collections::HashMap;

use crate::encoding::decode_rfc2047;

/// Collection of message headers, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .entry(name.into().to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets the first value for a header with RFC 2047 encoded words decoded.
    ///
    /// Falls back to the raw value when decoding fails; a garbled subject
    /// line should not make the whole message unparseable.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|raw| decode_rfc2047(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// Parses headers from the raw header section of a message.
    ///
    /// Continuation lines (leading space or tab) are unfolded into the
    /// preceding header value.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
            } else {
                if let Some((name, value)) = current.take() {
                    headers.add(name, value.trim().to_string());
                }
                if let Some((name, value)) = line.split_once(':') {
                    current = Some((name.trim().to_string(), value.trim().to_string()));
                }
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim().to_string());
        }

        headers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn parse_simple() {
        let headers = Headers::parse(
            "From: sender@example.com\r\nSubject: Test Message\r\nDate: Thu, 6 Aug 2026 10:00:00 +0300\r\n",
        );
        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(headers.get("subject"), Some("Test Message"));
    }

    #[test]
    fn parse_unfolds_continuation_lines() {
        let headers =
            Headers::parse("Content-Type: multipart/mixed;\r\n boundary=\"xyz\"\r\nSubject: ok\r\n");
        assert_eq!(
            headers.get("content-type"),
            Some("multipart/mixed; boundary=\"xyz\"")
        );
        assert_eq!(headers.get("subject"), Some("ok"));
    }

    #[test]
    fn parse_stops_at_blank_line() {
        let headers = Headers::parse("Subject: head\r\n\r\nNot-A-Header: body\r\n");
        assert_eq!(headers.get("subject"), Some("head"));
        assert_eq!(headers.get("not-a-header"), None);
    }

    #[test]
    fn get_decoded_subject() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(headers.get_decoded("subject").unwrap(), "Héllo");
    }

    #[test]
    fn get_decoded_falls_back_on_garbage() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?X?junk?=");
        assert_eq!(headers.get_decoded("subject").unwrap(), "=?utf-8?X?junk?=");
    }
}
