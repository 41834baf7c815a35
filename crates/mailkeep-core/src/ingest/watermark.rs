//! Watermark tracking.
//!
//! The watermark is the timestamp boundary separating processed from
//! unprocessed messages: only messages received strictly after it are
//! ingested. It lives in memory and is re-derived from the store on
//! startup, so it is never persisted alongside a message write — a crash
//! between persist and advance recovers an equivalent-or-earlier value and
//! duplicate detection absorbs the overlap.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

use crate::Result;
use crate::store::MessageStore;

/// Monotonic timestamp cursor over ingested messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    current: DateTime<FixedOffset>,
}

impl Watermark {
    /// Creates a watermark at the given instant.
    #[must_use]
    pub const fn new(initial: DateTime<FixedOffset>) -> Self {
        Self { current: initial }
    }

    /// Derives the startup watermark from the store: the latest stored
    /// received timestamp, or `now` minus one day when the store is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn derive(store: &MessageStore, now: DateTime<FixedOffset>) -> Result<Self> {
        let initial = match store.max_received_at().await? {
            Some(latest) => latest,
            None => now - Duration::days(1),
        };
        Ok(Self::new(initial))
    }

    /// Moves the watermark forward to `candidate`, only if it is strictly
    /// later than the current value. Returns whether it moved.
    pub fn advance(&mut self, candidate: DateTime<FixedOffset>) -> bool {
        if candidate > self.current {
            self.current = candidate;
            true
        } else {
            false
        }
    }

    /// The current boundary.
    #[must_use]
    pub const fn current(&self) -> DateTime<FixedOffset> {
        self.current
    }

    /// The boundary's calendar date, used as the coarse source-side floor.
    #[must_use]
    pub fn floor_date(&self) -> NaiveDate {
        self.current.date_naive()
    }
}
