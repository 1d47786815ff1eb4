//! Unified error types for chatharvest.
//!
//! This module provides a single [`HarvestError`] enum that covers all error
//! cases in the library, following the pattern used by popular crates like
//! `reqwest`, `serde_json`, and `csv`.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages
//! - **Pipeline stages** can distinguish "stop everything" failures
//!   ([`HarvestError::is_fatal`]) from "this page is just empty" failures
//!   that only degrade the result

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for chatharvest operations.
///
/// # Example
///
/// ```rust
/// use chatharvest::error::Result;
/// use chatharvest::core::models::NormalizedRecord;
///
/// fn my_function() -> Result<Vec<NormalizedRecord>> {
///     // ... operations that may fail
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, HarvestError>;

/// The error type for all chatharvest operations.
///
/// Each variant contains context about what went wrong and, where applicable,
/// the underlying source error. Network-level variants (`Http`, `Timeout`,
/// `Transport`) are only returned after the request executor has exhausted
/// its retry budget.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarvestError {
    /// The platform rejected the access token (HTTP 401).
    ///
    /// Never retried: a bad token will not get better, the whole run
    /// must abort.
    #[error("authentication failed: access token rejected (HTTP 401)")]
    Auth,

    /// An HTTP error status survived the retry budget.
    #[error("HTTP {status} from {endpoint} after retries")]
    Http {
        /// The final response status code
        status: u16,
        /// The endpoint path that failed
        endpoint: String,
    },

    /// The request timed out on every attempt.
    #[error("request to {endpoint} timed out after retries")]
    Timeout {
        /// The endpoint path that failed
        endpoint: String,
    },

    /// A connection-level failure survived the retry budget.
    #[error("transport error on {endpoint}: {reason}")]
    Transport {
        /// The endpoint path that failed
        endpoint: String,
        /// Description of the underlying failure
        reason: String,
    },

    /// The channel directory could not be loaded.
    ///
    /// Fatal: without the channel map there is no safe way to attribute
    /// messages to channels, so the caller must abort the run.
    #[error("failed to load channel directory: {reason}")]
    DirectoryLoad {
        /// Description of what was wrong with the response
        reason: String,
    },

    /// Invalid date in the run configuration.
    ///
    /// Date window bounds expect YYYY-MM-DD format.
    #[error("invalid date '{input}'. Expected format: {expected}")]
    InvalidDate {
        /// The invalid date string that was provided
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// A required environment variable is missing or empty.
    #[error("missing environment variable {name}")]
    MissingEnv {
        /// Name of the missing variable
        name: &'static str,
    },

    /// JSON parsing/serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred while writing output.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The run was cancelled by the caller.
    #[error("run cancelled")]
    Cancelled,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl HarvestError {
    /// Creates an HTTP status error.
    pub fn http(status: u16, endpoint: impl Into<String>) -> Self {
        HarvestError::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(endpoint: impl Into<String>) -> Self {
        HarvestError::Timeout {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        HarvestError::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a directory load error.
    pub fn directory_load(reason: impl Into<String>) -> Self {
        HarvestError::DirectoryLoad {
            reason: reason.into(),
        }
    }

    /// Creates an invalid date error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        HarvestError::InvalidDate {
            input: input.into(),
            expected: "YYYY-MM-DD",
        }
    }

    /// Returns `true` if this failure must abort the whole run.
    ///
    /// Non-fatal failures are recovered by the owning pipeline stage: a
    /// failed page stops that sweep, a failed message fetch skips that
    /// conversation, and the run continues with fewer records.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarvestError::Auth
                | HarvestError::DirectoryLoad { .. }
                | HarvestError::MissingEnv { .. }
                | HarvestError::Cancelled
        )
    }

    /// Returns `true` if this is an authentication failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, HarvestError::Auth)
    }

    /// Returns `true` if this is a date-related error.
    pub fn is_invalid_date(&self) -> bool {
        matches!(self, HarvestError::InvalidDate { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
