//! Channel directory loading.
//!
//! The directory maps channel (inbox) ids to display names and must exist
//! before discovery runs: without it there is no safe way to attribute
//! messages to channels, so a malformed listing fails the whole run.

use serde_json::Value;
use tracing::info;

use crate::client::{Executor, inboxes_endpoint};
use crate::core::models::{ChannelDirectory, UNKNOWN_CHANNEL};
use crate::error::{HarvestError, Result};

/// Loads the account's channel directory with a single listing query.
///
/// Entries without a numeric id are skipped; entries without a name get the
/// placeholder name.
///
/// # Errors
///
/// Fails closed with [`HarvestError::DirectoryLoad`] when the response is
/// missing the expected `payload` array. Executor failures (auth, exhausted
/// retries) propagate unchanged.
pub async fn load_channel_directory<E: Executor>(
    executor: &E,
    account: &str,
) -> Result<ChannelDirectory> {
    let response = executor.execute(&inboxes_endpoint(account), &[]).await?;

    let payload = response
        .get("payload")
        .and_then(Value::as_array)
        .ok_or_else(|| HarvestError::directory_load("response missing payload array"))?;

    let mut directory = ChannelDirectory::new();
    for inbox in payload {
        let Some(id) = inbox.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let name = inbox
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_CHANNEL);
        directory.insert(id, name);
    }

    info!(channels = directory.len(), "channel directory loaded");
    Ok(directory)
}
