//! Configuration types for connection settings and run parameters.
//!
//! Two structs cover everything a run needs, with no ambient state:
//!
//! - [`Settings`] - where the platform lives and how to authenticate,
//!   resolved from the environment once at startup
//! - [`RunConfig`] - the per-run knobs: date window, channel selection,
//!   throttling, retry budget, worker count
//!
//! # Example
//!
//! ```rust
//! use chatharvest::config::RunConfig;
//! use chatharvest::core::filter::DateWindow;
//!
//! # fn main() -> chatharvest::Result<()> {
//! let config = RunConfig::new()
//!     .with_window(Some(DateWindow::from_dates("2025-01-01", "2025-01-31")?))
//!     .with_workers(8);
//! # Ok(())
//! # }
//! ```

use std::env;
use std::time::Duration;

use crate::core::filter::DateWindow;
use crate::error::{HarvestError, Result};

/// Connection settings for the platform API.
///
/// Resolved from the environment (after the caller has run `dotenv`), the
/// three variables every deployment must provide:
///
/// | Variable | Meaning |
/// |----------|---------|
/// | `CHATWOOT_API_URL` | Base URL of the platform installation |
/// | `CHATWOOT_ACCESS_TOKEN` | Static API access token |
/// | `CHATWOOT_ACCOUNT_ID` | Numeric account identifier |
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base API URL without a trailing slash.
    pub api_url: String,

    /// Static access token sent with every request.
    pub access_token: String,

    /// Account identifier embedded in every endpoint path.
    pub account_id: String,
}

impl Settings {
    /// Reads settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::MissingEnv`] naming the first variable that
    /// is missing or empty.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: required("CHATWOOT_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            access_token: required("CHATWOOT_ACCESS_TOKEN")?,
            account_id: required("CHATWOOT_ACCOUNT_ID")?,
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(HarvestError::MissingEnv { name }),
    }
}

/// Per-run configuration.
///
/// Immutable for the duration of a run; the pipeline and the request
/// executor borrow it rather than holding mutable copies.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Optional inclusive date window; `None` means full history.
    pub window: Option<DateWindow>,

    /// Optional explicit channel selection; `None` means all channels.
    pub channels: Option<Vec<i64>>,

    /// Preventive delay paid after every successful request (default 500ms).
    pub rate_limit_delay: Duration,

    /// Total attempts per request before a typed failure (default 3).
    pub max_retries: u32,

    /// Base of the exponential backoff between retries (default 1s).
    pub backoff_base: Duration,

    /// Bounded per-request timeout (default 30s).
    pub request_timeout: Duration,

    /// Width of the message-fetch worker pool (default 4).
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            window: None,
            channels: None,
            rate_limit_delay: Duration::from_millis(500),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            workers: 4,
        }
    }
}

impl RunConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the date window; `None` means full history.
    #[must_use]
    pub fn with_window(mut self, window: Option<DateWindow>) -> Self {
        self.window = window;
        self
    }

    /// Restricts discovery to the given channel ids.
    #[must_use]
    pub fn with_channels(mut self, channels: Option<Vec<i64>>) -> Self {
        self.channels = channels;
        self
    }

    /// Sets the preventive rate-limit delay.
    #[must_use]
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Sets the total attempts per request.
    #[must_use]
    pub fn with_max_retries(mut self, attempts: u32) -> Self {
        self.max_retries = attempts.max(1);
        self
    }

    /// Sets the exponential backoff base.
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the worker pool width for message fetches.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
