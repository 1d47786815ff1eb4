//! Multi-strategy conversation discovery.
//!
//! Platform accounts and versions behave inconsistently: some reject global
//! conversation queries, some silently cap result counts, and two different
//! response envelopes are in the wild. Discovery therefore runs a primary
//! strategy (a global paginated sweep tried across status filters) and,
//! only when that yields nothing, a fallback strategy (a per-channel sweep
//! over the directory). The union is deduplicated by conversation id.
//!
//! An empty result is not an error: it is the valid "nothing to export"
//! outcome. Only fatal failures (authentication, cancellation) propagate.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{Executor, conversations_endpoint};
use crate::core::models::{ChannelDirectory, Conversation};
use crate::core::pipeline::CancelFlag;
use crate::error::Result;

/// Status filters the global sweep tries, in order. The first filter that
/// yields results is authoritative and the rest are skipped; `all` leads
/// because it is a superset on every account that supports it.
const STATUS_FILTERS: [&str; 4] = ["all", "open", "resolved", "pending"];

/// Parameter combinations the per-channel sweep tries for each channel.
/// `None` means no status parameter at all.
const FALLBACK_STATUSES: [Option<&str>; 4] = [Some("all"), Some("open"), Some("resolved"), None];

/// Page size assumed when the envelope's meta does not report one.
const DEFAULT_PER_PAGE: u64 = 25;

/// One parsed page of the conversation listing.
#[derive(Debug, Default)]
struct Page {
    conversations: Vec<Conversation>,
    total_count: u64,
    per_page: u64,
}

/// Pulls the conversation array out of either known envelope shape:
/// `{data: {payload: [...]}, ...}` or `{payload: [...], ...}`.
///
/// Entries that fail to deserialize are skipped rather than failing the
/// page.
fn extract_payload(response: &Value) -> Vec<Conversation> {
    let payload = response
        .get("data")
        .and_then(|data| data.get("payload"))
        .or_else(|| response.get("payload"));

    let Some(items) = payload.and_then(Value::as_array) else {
        return Vec::new();
    };

    let conversations: Vec<Conversation> = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();
    if conversations.len() < items.len() {
        warn!(
            skipped = items.len() - conversations.len(),
            "skipped malformed conversation entries"
        );
    }
    conversations
}

/// Parses a paginated page: payload in either envelope shape plus the
/// top-level `meta` counters. Returns `None` when `meta` is absent, which
/// marks the response as unusable for the paginated sweep.
fn parse_page(response: &Value) -> Option<Page> {
    let meta = response.get("meta")?;
    Some(Page {
        conversations: extract_payload(response),
        total_count: meta.get("count").and_then(Value::as_u64).unwrap_or(0),
        per_page: meta
            .get("per_page")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_PER_PAGE)
            .max(1),
    })
}

/// Removes duplicate conversations, keeping the first occurrence of each
/// id. Conversations are immutable snapshots within a run, so any one copy
/// is representative.
pub fn dedup_by_id(conversations: Vec<Conversation>) -> Vec<Conversation> {
    let mut seen = HashSet::new();
    conversations
        .into_iter()
        .filter(|conversation| seen.insert(conversation.id))
        .collect()
}

/// Primary strategy: global paginated sweep across status filters.
async fn global_sweep<E: Executor>(
    executor: &E,
    account: &str,
    cancel: &CancelFlag,
) -> Result<Vec<Conversation>> {
    let endpoint = conversations_endpoint(account);

    for status in STATUS_FILTERS {
        cancel.check()?;
        debug!(status, "trying global conversation sweep");

        let first = match executor.execute(&endpoint, &page_query(1, status)).await {
            Ok(response) => response,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(status, error = %e, "first page failed, trying next status");
                continue;
            }
        };

        let Some(page) = parse_page(&first) else {
            debug!(status, "unrecognized envelope, trying next status");
            continue;
        };
        if page.total_count == 0 {
            continue;
        }

        info!(status, count = page.total_count, "conversations found");
        let total_pages = page.total_count.div_ceil(page.per_page);
        let mut collected = page.conversations;

        for page_no in 2..=total_pages {
            cancel.check()?;
            match executor
                .execute(&endpoint, &page_query(page_no, status))
                .await
            {
                Ok(response) => match parse_page(&response) {
                    Some(next) if !next.conversations.is_empty() => {
                        collected.extend(next.conversations);
                    }
                    // An empty or unusable page ends the sweep early.
                    _ => break,
                },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(status, page = page_no, error = %e, "page fetch failed, stopping sweep");
                    break;
                }
            }
        }

        // First status with results wins; narrower filters are only a
        // fallback for accounts that reject `all`.
        return Ok(collected);
    }

    Ok(Vec::new())
}

fn page_query(page: u64, status: &str) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("status", status.to_string())]
}

/// Fallback strategy: sweep each channel in the directory, trying parameter
/// combinations until one returns conversations for that channel.
async fn channel_sweep<E: Executor>(
    executor: &E,
    account: &str,
    directory: &ChannelDirectory,
    cancel: &CancelFlag,
) -> Result<Vec<Conversation>> {
    let endpoint = conversations_endpoint(account);
    let mut collected = Vec::new();

    for channel_id in directory.ids_sorted() {
        cancel.check()?;

        for status in FALLBACK_STATUSES {
            let mut query = vec![("inbox_id", channel_id.to_string())];
            if let Some(status) = status {
                query.push(("status", status.to_string()));
            }

            match executor.execute(&endpoint, &query).await {
                Ok(response) => {
                    let conversations = extract_payload(&response);
                    if !conversations.is_empty() {
                        debug!(
                            channel = channel_id,
                            count = conversations.len(),
                            "conversations found on channel"
                        );
                        collected.extend(conversations);
                        break;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(channel = channel_id, error = %e, "channel query failed");
                }
            }
        }
    }

    let unique = dedup_by_id(collected);
    info!(count = unique.len(), "unique conversations collected");
    Ok(unique)
}

/// Finds the full conversation set for the account.
///
/// With an explicit channel selection the per-channel sweep runs directly
/// against only that subset. Otherwise the global sweep runs first and the
/// per-channel sweep is invoked only when it yields nothing.
pub async fn discover_conversations<E: Executor>(
    executor: &E,
    account: &str,
    directory: &ChannelDirectory,
    selection: Option<&[i64]>,
    cancel: &CancelFlag,
) -> Result<Vec<Conversation>> {
    if let Some(selected) = selection {
        let subset = directory.select(selected);
        if subset.is_empty() {
            warn!("channel selection matched no known channels");
            return Ok(Vec::new());
        }
        return channel_sweep(executor, account, &subset, cancel).await;
    }

    let found = global_sweep(executor, account, cancel).await?;
    if !found.is_empty() {
        return Ok(found);
    }

    info!("global sweep found nothing, falling back to per-channel sweep");
    channel_sweep(executor, account, directory, cancel).await
}
