//! Progress reporting types for long-running harvest runs.
//!
//! This module provides a callback-based progress reporting mechanism for
//! callers who want push-based updates at pipeline milestones (directory
//! loaded, discovery complete, transform progress, save complete) without
//! the core branching on whether a callback was supplied.
//!
//! The callback is a pure observer: it never influences control flow.
//!
//! # Example
//!
//! ```rust
//! use chatharvest::progress::{Progress, ProgressCallback};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     match progress.percent {
//!         Some(pct) => println!("[{pct:>3.0}%] {}", progress.message),
//!         None => println!("[ ...] {}", progress.message),
//!     }
//! });
//!
//! callback(Progress::new(Some(40.0), "120 conversations discovered"));
//! ```

use std::sync::Arc;

/// A single progress update.
///
/// The percentage is optional: some milestones (for example the very first
/// "loading" notice) have no meaningful completion estimate yet.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    /// Overall run completion (0.0 - 100.0), if known.
    pub percent: Option<f64>,

    /// Human-readable description of the milestone.
    pub message: String,
}

impl Progress {
    /// Creates a new progress update.
    pub fn new(percent: Option<f64>, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }

    /// Returns `true` if this update marks the end of the run.
    pub fn is_complete(&self) -> bool {
        self.percent.is_some_and(|pct| pct >= 100.0)
    }
}

/// Callback type for receiving progress updates.
///
/// This is a thread-safe callback invoked at named pipeline milestones.
///
/// # Example
///
/// ```rust
/// use chatharvest::progress::{Progress, ProgressCallback};
/// use std::sync::Arc;
///
/// let callback: ProgressCallback = Arc::new(|progress| {
///     eprintln!("{}", progress.message);
/// });
///
/// callback(Progress::new(Some(100.0), "Export saved"));
/// ```
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Creates a no-op progress callback.
///
/// Useful for headless and test runs where progress output is unwanted.
///
/// # Example
///
/// ```rust
/// use chatharvest::progress::no_progress;
///
/// let callback = no_progress();
/// callback(chatharvest::progress::Progress::default()); // Does nothing
/// ```
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that prints to stderr.
///
/// This is what the CLI uses to narrate a run.
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| match progress.percent {
        Some(pct) => eprintln!("[{pct:>3.0}%] {}", progress.message),
        None => eprintln!("[ ...] {}", progress.message),
    })
}
