//! # Chatharvest
//!
//! A Rust library and CLI for harvesting the complete conversation history
//! of a Chatwoot-compatible customer-messaging platform into a flat,
//! analysis-ready record stream.
//!
//! ## Overview
//!
//! Chatwoot-style installations expose conversations and messages through
//! a paginated REST API that behaves inconsistently across accounts and
//! versions: some reject global conversation queries, some cap result
//! counts, and two response envelope shapes are in the wild. Chatharvest
//! wraps that reality in a resilient extraction pipeline:
//!
//! - an HTTP access layer with retry, exponential backoff, cooperative
//!   429 handling, and a shared preventive rate limit
//! - multi-strategy conversation discovery (global sweep with a
//!   per-channel fallback) deduplicated by conversation id
//! - optional inclusive date windowing, cheap at the conversation level
//!   and authoritative at the message level
//! - a transformer that flattens every message into one normalized record
//!   with customer, agent, and channel identity resolved
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatharvest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> chatharvest::Result<()> {
//!     dotenv::dotenv().ok();
//!
//!     let settings = Settings::from_env()?;
//!     let config = RunConfig::new()
//!         .with_window(Some(DateWindow::from_dates("2025-01-01", "2025-01-31")?));
//!
//!     let client = ApiClient::new(&settings, &config)?;
//!     let report = run_harvest(
//!         &client,
//!         &settings.account_id,
//!         &config,
//!         &no_progress(),
//!         &CancelFlag::new(),
//!     )
//!     .await?;
//!
//!     println!("{} messages harvested", report.message_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`client`] - Request executor: [`ApiClient`](client::ApiClient),
//!   the [`Executor`](client::Executor) seam, and the
//!   [`Transport`](client::Transport) seam beneath it
//! - [`config`] - [`Settings`](config::Settings) from the environment and
//!   the per-run [`RunConfig`](config::RunConfig)
//! - [`core`] - The pipeline itself
//!   - [`core::models`] - [`Conversation`](core::models::Conversation),
//!     [`NormalizedRecord`](core::models::NormalizedRecord),
//!     [`ChannelDirectory`](core::models::ChannelDirectory)
//!   - [`core::discovery`] - conversation discovery strategies
//!   - [`core::filter`] - [`DateWindow`](core::filter::DateWindow) filtering
//!   - [`core::transform`] - message normalization
//!   - [`core::pipeline`] - [`run_harvest`](core::pipeline::run_harvest),
//!     [`CancelFlag`](core::pipeline::CancelFlag)
//!   - [`core::output`] - JSON dump writer
//! - [`progress`] - Milestone reporting
//!   ([`ProgressCallback`](progress::ProgressCallback))
//! - [`cli`] - CLI types (requires the `cli` feature)
//! - [`error`] - Unified error types ([`HarvestError`], [`Result`])
//! - [`prelude`] - Convenient re-exports

pub mod client;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod progress;

// Re-export the main types at the crate root for convenience
pub use error::{HarvestError, Result};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatharvest::prelude::*;
/// ```
pub mod prelude {
    // Error types
    pub use crate::error::{HarvestError, Result};

    // HTTP access layer
    pub use crate::client::{ApiClient, Executor, Transport};

    // Configuration
    pub use crate::config::{RunConfig, Settings};

    // Models
    pub use crate::core::models::{ChannelDirectory, Conversation, NormalizedRecord};

    // Pipeline stages
    pub use crate::core::discovery::discover_conversations;
    pub use crate::core::filter::{DateWindow, filter_conversations, message_in_window};
    pub use crate::core::pipeline::{CancelFlag, HarvestReport, run_harvest};
    pub use crate::core::transform::transform_conversations;

    // Output
    pub use crate::core::output::{export_filename, to_json, write_json};

    // Progress reporting
    pub use crate::progress::{Progress, ProgressCallback, no_progress, stderr_progress};
}
