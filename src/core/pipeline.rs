//! Four-stage harvest pipeline.
//!
//! Directory → Discovery → Filter → Transform, strictly in that order,
//! with no branching back and no partial restart: a failed run is simply
//! re-executed from the start. The pipeline holds no ambient state; the
//! directory and counters travel through explicit arguments and the
//! returned report.
//!
//! Persistence stays outside: the caller receives the final record batch
//! and decides where it goes, so a cancelled or failed run never leaves a
//! partial file behind.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::client::Executor;
use crate::config::RunConfig;
use crate::core::directory::load_channel_directory;
use crate::core::discovery::discover_conversations;
use crate::core::filter::filter_conversations;
use crate::core::models::NormalizedRecord;
use crate::core::transform::transform_conversations;
use crate::error::{HarvestError, Result};
use crate::progress::{Progress, ProgressCallback};

const PCT_DIRECTORY: f64 = 10.0;
const PCT_DISCOVERY: f64 = 20.0;
const PCT_FILTERED: f64 = 25.0;

/// Caller-initiated cancellation, checked between pages and between
/// conversations so a long harvest can be aborted promptly.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Converts a requested cancellation into the typed failure.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HarvestError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// What a completed run produced, with the counters the summary reports.
#[derive(Debug)]
pub struct HarvestReport {
    /// The final normalized record batch, in conversation input order.
    pub records: Vec<NormalizedRecord>,

    /// Channels in the loaded directory.
    pub channels: usize,

    /// Conversations the discovery stage found (after dedup).
    pub conversations_discovered: usize,

    /// Conversations that survived the date pre-filter.
    pub conversations_retained: usize,
}

impl HarvestReport {
    /// Number of normalized messages in the batch.
    pub fn message_count(&self) -> usize {
        self.records.len()
    }

    /// `true` when there is nothing to export.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs the full harvest and returns the record batch plus counters.
///
/// Progress is reported at the named milestones; the callback is a pure
/// observer. An empty discovery result short-circuits the remaining
/// stages and returns an empty report, which is a valid outcome, not an
/// error.
pub async fn run_harvest<E: Executor>(
    executor: &E,
    account: &str,
    config: &RunConfig,
    progress: &ProgressCallback,
    cancel: &CancelFlag,
) -> Result<HarvestReport> {
    progress(Progress::new(None, "Loading channel directory"));
    let directory = load_channel_directory(executor, account).await?;
    progress(Progress::new(
        Some(PCT_DIRECTORY),
        format!("{} channels mapped", directory.len()),
    ));

    cancel.check()?;
    let discovered = discover_conversations(
        executor,
        account,
        &directory,
        config.channels.as_deref(),
        cancel,
    )
    .await?;
    let conversations_discovered = discovered.len();
    progress(Progress::new(
        Some(PCT_DISCOVERY),
        format!("{conversations_discovered} conversations discovered"),
    ));

    if discovered.is_empty() {
        info!("no conversations found, nothing to export");
        return Ok(HarvestReport {
            records: Vec::new(),
            channels: directory.len(),
            conversations_discovered: 0,
            conversations_retained: 0,
        });
    }

    let retained = filter_conversations(discovered, config.window.as_ref());
    let conversations_retained = retained.len();
    progress(Progress::new(
        Some(PCT_FILTERED),
        format!("{conversations_retained} conversations in the date window"),
    ));

    let records = transform_conversations(
        executor,
        account,
        &retained,
        &directory,
        config.window.as_ref(),
        config.workers,
        progress,
        cancel,
    )
    .await?;

    info!(
        conversations = conversations_retained,
        messages = records.len(),
        "harvest complete"
    );

    Ok(HarvestReport {
        records,
        channels: directory.len(),
        conversations_discovered,
        conversations_retained,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_starts_clear() {
        let cancel = CancelFlag::new();
        assert!(!cancel.is_cancelled());
        assert!(cancel.check().is_ok());
    }

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let cancel = CancelFlag::new();
        let observer = cancel.clone();
        cancel.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(observer.check(), Err(HarvestError::Cancelled)));
    }

    #[test]
    fn test_report_counters() {
        let report = HarvestReport {
            records: Vec::new(),
            channels: 2,
            conversations_discovered: 5,
            conversations_retained: 3,
        };
        assert!(report.is_empty());
        assert_eq!(report.message_count(), 0);
    }
}
