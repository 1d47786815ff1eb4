//! Export writers for the normalized record batch.
//!
//! The harvest dump is a single pretty-printed JSON array, the shape the
//! downstream analysis tooling ingests. The filename embeds the harvested
//! period and a generation timestamp so repeated runs never collide.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatharvest::core::output::{export_filename, write_json};
//! use chrono::Utc;
//! use std::path::Path;
//!
//! # fn main() -> chatharvest::Result<()> {
//! let records = vec![];
//! let filename = export_filename(None, Utc::now());
//! write_json(&records, Path::new(&filename))?;
//! # Ok(())
//! # }
//! ```

mod json_writer;

pub use json_writer::{export_filename, to_json, write_json};
