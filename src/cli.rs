//! Command-line interface definition using clap.
//!
//! This module defines [`Args`], the CLI argument structure. Connection
//! settings stay in the environment (see [`crate::config::Settings`]); the
//! flags here only shape a single run.

use clap::Parser;

use crate::core::filter::DateWindow;
use crate::error::Result;

/// Harvest the full conversation history of a Chatwoot-compatible
/// account into a flat JSON dump for downstream analysis.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatharvest")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatharvest --full-history
    chatharvest --start-date 2025-01-01 --end-date 2025-01-31
    chatharvest --start-date 2025-01-01 --end-date 2025-01-31 --channel 101 --channel 102
    chatharvest --full-history -o exports/ --workers 10

ENVIRONMENT (or .env file):
    CHATWOOT_API_URL        Base URL of the platform installation
    CHATWOOT_ACCESS_TOKEN   Static API access token
    CHATWOOT_ACCOUNT_ID     Numeric account identifier")]
pub struct Args {
    /// First day of the harvest window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "end_date")]
    pub start_date: Option<String>,

    /// Last day of the harvest window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", requires = "start_date")]
    pub end_date: Option<String>,

    /// Harvest the complete history (no date window)
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    pub full_history: bool,

    /// Restrict the harvest to a channel id (repeatable)
    #[arg(long = "channel", value_name = "ID")]
    pub channels: Vec<i64>,

    /// Directory the dump file is written into
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output: String,

    /// Preventive delay after every successful request, in milliseconds
    #[arg(long, default_value_t = 500, value_name = "MS")]
    pub rate_limit_ms: u64,

    /// Width of the message-fetch worker pool
    #[arg(long, default_value_t = 4, value_name = "N")]
    pub workers: usize,
}

impl Args {
    /// Builds the date window from the flags.
    ///
    /// No dates (or `--full-history`) means full-history mode, the
    /// identity filter.
    pub fn window(&self) -> Result<Option<DateWindow>> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Ok(Some(DateWindow::from_dates(start, end)?)),
            _ => Ok(None),
        }
    }

    /// The channel selection, `None` when no `--channel` flag was given.
    pub fn channel_selection(&self) -> Option<Vec<i64>> {
        if self.channels.is_empty() {
            None
        } else {
            Some(self.channels.clone())
        }
    }
}
