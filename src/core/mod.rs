//! Core extraction pipeline for chatharvest.
//!
//! This module contains:
//! - [`models`] - Conversations, messages, the channel directory, and the
//!   normalized record shape
//! - [`directory`] - Channel directory loading
//! - [`discovery`] - Multi-strategy conversation discovery
//! - [`filter`] - Date-window filtering
//! - [`transform`] - Conversation to flat-record transformation
//! - [`pipeline`] - Four-stage orchestration and cancellation
//! - [`output`] - JSON dump writer and filename convention

pub mod directory;
pub mod discovery;
pub mod filter;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod transform;

// Re-export main types for convenience
pub use directory::load_channel_directory;
pub use discovery::discover_conversations;
pub use filter::{DateWindow, filter_conversations, message_in_window};
pub use models::{ChannelDirectory, Conversation, NormalizedRecord};
pub use output::{export_filename, to_json, write_json};
pub use pipeline::{CancelFlag, HarvestReport, run_harvest};
pub use transform::{records_for_conversation, transform_conversations};
