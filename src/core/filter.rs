//! Date-window filtering for conversations and messages.
//!
//! This module provides [`DateWindow`] for defining an inclusive date range
//! and the two filter passes the pipeline runs:
//!
//! | Pass | Function | Role |
//! |------|----------|------|
//! | Conversation | [`filter_conversations`] | cheap pre-filter on last activity |
//! | Message | [`message_in_window`] | authoritative per-message filter |
//!
//! The conversation pass only ever drops a conversation whose parseable
//! last-activity timestamp lies strictly before the window start; anything
//! missing or unparseable is conservatively kept and left to the message
//! pass. The message pass keeps unparseable timestamps to avoid silent data
//! loss.
//!
//! # Examples
//!
//! ```
//! use chatharvest::core::filter::{DateWindow, message_in_window};
//!
//! # fn main() -> chatharvest::Result<()> {
//! let window = DateWindow::from_dates("2025-01-01", "2025-01-31")?;
//!
//! // 2025-01-10T09:00:00Z
//! assert!(message_in_window(Some(1_736_499_600), Some(&window)));
//! // 2025-02-05T10:00:00Z
//! assert!(!message_in_window(Some(1_738_749_600), Some(&window)));
//! // missing timestamp is kept
//! assert!(message_in_window(None, Some(&window)));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::core::models::Conversation;
use crate::error::{HarvestError, Result};

/// An inclusive [start, end] date range in UTC.
///
/// The start is normalized to 00:00:00 and the end to 23:59:59 of their
/// respective calendar days. The absence of a window (`Option::None` at the
/// call sites) means no filtering at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// First instant inside the window.
    pub start: DateTime<Utc>,

    /// Last instant inside the window.
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Builds a window from two calendar dates in `YYYY-MM-DD` format.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::InvalidDate`] if either date fails to parse
    /// or the start lies after the end.
    pub fn from_dates(start: &str, end: &str) -> Result<Self> {
        let start_day = parse_date(start)?;
        let end_day = parse_date(end)?;

        let window = Self {
            start: start_day.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            end: end_day.and_hms_opt(23, 59, 59).unwrap().and_utc(),
        };
        if window.start > window.end {
            return Err(HarvestError::invalid_date(format!("{start}..{end}")));
        }
        Ok(window)
    }

    /// Returns `true` if the instant falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// The window as a filename-friendly label, e.g. `2025-01-01_to_2025-01-31`.
    pub fn label(&self) -> String {
        format!(
            "{}_to_{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| HarvestError::invalid_date(input))
}

/// Cheap conversation-level pre-pass.
///
/// Drops a conversation only when its last-activity timestamp parses and is
/// strictly earlier than the window start. Assumes last activity never
/// precedes any of the conversation's message timestamps; anything missing
/// or unparseable is kept and left to the message pass.
pub fn filter_conversations(
    conversations: Vec<Conversation>,
    window: Option<&DateWindow>,
) -> Vec<Conversation> {
    let Some(window) = window else {
        return conversations;
    };

    conversations
        .into_iter()
        .filter(|conversation| {
            match conversation
                .last_activity_at
                .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            {
                Some(last_activity) => last_activity >= window.start,
                // Missing or unparseable last activity: keep, the message
                // pass decides.
                None => true,
            }
        })
        .collect()
}

/// Authoritative message-level filter.
///
/// A message is excluded only when its creation time parses and falls
/// outside the window. Unparseable or absent timestamps are kept.
pub fn message_in_window(created_epoch: Option<i64>, window: Option<&DateWindow>) -> bool {
    let Some(window) = window else {
        return true;
    };
    match created_epoch.and_then(|epoch| DateTime::from_timestamp(epoch, 0)) {
        Some(created) => window.contains(created),
        None => true,
    }
}
