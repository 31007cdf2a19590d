//! End-to-end ingest pipeline: range → dispatch → workers → aggregate → store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use orbitscrape_crawler::{DedupOracle, HttpFetcher, Worker, result_channels};
use orbitscrape_shared::{IngestConfig, NoradId, Result};
use orbitscrape_storage::Store;

use crate::aggregator::{AggregateStats, Aggregator};
use crate::dispatcher::{DispatchStats, Dispatcher};

/// Result channel capacity per unit of concurrency.
const CHANNEL_SLOTS_PER_WORKER: usize = 4;

/// Summary of one ingest run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Unique, time-sortable run identifier.
    pub run_id: Uuid,
    pub start: NoradId,
    pub end: NoradId,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub dispatch: DispatchStats,
    pub aggregate: AggregateStats,
}

impl IngestReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn cancelled(&self) -> bool {
        self.dispatch.cancelled
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each satellite record is persisted.
    fn satellite_stored(&self, id: NoradId, stored: u64, total: u64);
    /// Called when the pipeline completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn satellite_stored(&self, _id: NoradId, _stored: u64, _total: u64) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Run the full ingest over `config.start..=config.end`.
///
/// 1. Open the output store
/// 2. Start the aggregator and the worker pool
/// 3. Dispatch identifiers at the configured pace
/// 4. Wait for every worker, then for the aggregator to drain
///
/// Only setup failures are returned as errors; per-identifier failures end up
/// as missing output.
#[instrument(skip_all, fields(start = %config.start, end = %config.end))]
pub async fn run_ingest(
    config: &IngestConfig,
    progress: &dyn ProgressReporter,
    cancel: CancellationToken,
) -> Result<IngestReport> {
    config.validate()?;

    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    let clock = Instant::now();

    info!(
        %run_id,
        start = %config.start,
        end = %config.end,
        concurrency = config.concurrency,
        pacing_ms = config.pacing_ms,
        "pulling satellites"
    );

    progress.phase("Opening output store");
    let store = Store::open(&config.output_dir).await?;

    let fetcher = HttpFetcher::new(
        &config.catalog,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let oracle = Arc::new(DedupOracle::new(store.clone()));

    let concurrency = config.concurrency as usize;
    let (senders, receivers) = result_channels(concurrency * CHANNEL_SLOTS_PER_WORKER);

    // The worker owns the only senders; the aggregator ends when the pool is gone.
    let worker = Worker::new(fetcher, Arc::clone(&oracle), senders);
    let dispatcher = Dispatcher::new(worker, concurrency, config.pacing());
    let aggregator = Aggregator::new(store, oracle, config.range_len());

    progress.phase("Crawling catalog");
    let (dispatch, aggregate) = tokio::join!(
        dispatcher.run(config.start, config.end, cancel),
        aggregator.run(receivers, progress),
    );

    let report = IngestReport {
        run_id,
        start: config.start,
        end: config.end,
        started_at,
        elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        dispatch,
        aggregate,
    };

    info!(
        %run_id,
        dispatched = report.dispatch.dispatched,
        completed = report.dispatch.completed,
        categories = report.aggregate.categories_written,
        descriptions = report.aggregate.descriptions_written,
        images = report.aggregate.images_written,
        write_failures = report.aggregate.write_failures,
        cancelled = report.cancelled(),
        elapsed_ms = report.elapsed_ms,
        "done"
    );

    progress.done(&report);
    Ok(report)
}
