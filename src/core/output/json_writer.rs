//! JSON dump writer.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::core::filter::DateWindow;
use crate::core::models::NormalizedRecord;
use crate::error::Result;

/// Writes the record batch to a file as a pretty-printed JSON array.
///
/// # Format
/// ```json
/// [
///   {
///     "conversation_id": 5001,
///     "customer_name": "Maria Silva",
///     "channel_name": "WhatsApp",
///     ...
///   }
/// ]
/// ```
pub fn write_json(records: &[NormalizedRecord], path: &Path) -> Result<()> {
    let json = to_json(records)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Converts the record batch to a JSON string.
///
/// Same format as [`write_json`], but returns a String instead of writing
/// to a file.
pub fn to_json(records: &[NormalizedRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Builds the export filename for a run.
///
/// The name carries the harvested period and a generation timestamp:
/// `chatwoot_2025-01-01_to_2025-01-31_20250131_174500.json` for a windowed
/// run, `chatwoot_full_history_20250131_174500.json` otherwise.
pub fn export_filename(window: Option<&DateWindow>, generated_at: DateTime<Utc>) -> String {
    let period = window.map_or_else(|| "full_history".to_string(), DateWindow::label);
    format!(
        "chatwoot_{period}_{}.json",
        generated_at.format("%Y%m%d_%H%M%S")
    )
}
