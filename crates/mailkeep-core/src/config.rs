//! Service configuration, loaded from the environment.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::{Error, Result};

/// IMAP server endpoint and credentials.
#[derive(Debug, Clone, Default)]
pub struct ImapEndpoint {
    /// Server hostname.
    pub host: String,
    /// Server port (993 for implicit TLS).
    pub port: u16,
    /// Login username (the mailbox address).
    pub username: String,
    /// Login password.
    pub password: String,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mail server endpoint.
    pub imap: ImapEndpoint,
    /// Folder to monitor.
    pub mailbox: String,
    /// Path of the `SQLite` database file.
    pub database_path: String,
    /// Fixed UTC offset all received timestamps are normalized to.
    pub utc_offset: FixedOffset,
    /// Steady-state pause between mailbox checks.
    pub check_interval: Duration,
    /// Short pause after a failed connection attempt or a failed cycle.
    pub retry_delay: Duration,
    /// Long pause after `max_retries` consecutive connection failures.
    pub backoff_delay: Duration,
    /// Consecutive connection failures before the long backoff kicks in.
    pub max_retries: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `EMAIL_ADDRESS` and `EMAIL_PASSWORD` are required; everything else
    /// has a default (`IMAP_SERVER`=imap.gmail.com, `IMAP_PORT`=993,
    /// `MAILBOX`=INBOX, `DATABASE_PATH`=mailkeep.db, `UTC_OFFSET_HOURS`=3,
    /// `CHECK_INTERVAL_SECS`=30, `RETRY_DELAY_SECS`=5,
    /// `BACKOFF_DELAY_SECS`=60, `MAX_RETRIES`=3).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails
    /// to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<&str> = ["EMAIL_ADDRESS", "EMAIL_PASSWORD"]
            .into_iter()
            .filter(|key| get(key).is_none_or(|v| v.is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let offset_hours: i32 = parse_var(&get, "UTC_OFFSET_HOURS", 3)?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| Error::Config(format!("UTC_OFFSET_HOURS out of range: {offset_hours}")))?;

        Ok(Self {
            imap: ImapEndpoint {
                host: get("IMAP_SERVER").unwrap_or_else(|| "imap.gmail.com".to_string()),
                port: parse_var(&get, "IMAP_PORT", 993)?,
                username: get("EMAIL_ADDRESS").unwrap_or_default(),
                password: get("EMAIL_PASSWORD").unwrap_or_default(),
            },
            mailbox: get("MAILBOX").unwrap_or_else(|| "INBOX".to_string()),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "mailkeep.db".to_string()),
            utc_offset,
            check_interval: Duration::from_secs(parse_var(&get, "CHECK_INTERVAL_SECS", 30)?),
            retry_delay: Duration::from_secs(parse_var(&get, "RETRY_DELAY_SECS", 5)?),
            backoff_delay: Duration::from_secs(parse_var(&get, "BACKOFF_DELAY_SECS", 60)?),
            max_retries: parse_var(&get, "MAX_RETRIES", 3)?,
        })
    }

    /// The current instant in the configured fixed offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }
}

fn parse_var<T: std::str::FromStr>(
    get: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_applied() {
        let config = Config::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "user@example.com"),
            ("EMAIL_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.imap.host, "imap.gmail.com");
        assert_eq!(config.imap.port, 993);
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.backoff_delay, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.utc_offset, FixedOffset::east_opt(3 * 3600).unwrap());
    }

    #[test]
    fn missing_credentials_reported_together() {
        let err = Config::from_lookup(lookup(&[])).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("EMAIL_ADDRESS"));
        assert!(message.contains("EMAIL_PASSWORD"));
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", ""),
            ("EMAIL_PASSWORD", "secret"),
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().contains("EMAIL_ADDRESS"));
    }

    #[test]
    fn overrides_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "user@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("IMAP_SERVER", "mail.example.com"),
            ("IMAP_PORT", "1993"),
            ("UTC_OFFSET_HOURS", "-5"),
            ("CHECK_INTERVAL_SECS", "10"),
            ("MAX_RETRIES", "7"),
        ]))
        .unwrap();

        assert_eq!(config.imap.host, "mail.example.com");
        assert_eq!(config.imap.port, 1993);
        assert_eq!(config.utc_offset, FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.max_retries, 7);
    }

    #[test]
    fn invalid_number_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("EMAIL_ADDRESS", "user@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("IMAP_PORT", "not-a-port"),
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().contains("IMAP_PORT"));
    }
}
