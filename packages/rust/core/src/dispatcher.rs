//! Paced dispatch of identifiers to a bounded worker pool.
//!
//! Identifiers go through one shared queue to `concurrency` worker tasks. The
//! dispatcher waits for every worker to finish before returning, so once
//! [`Dispatcher::run`] resolves every result has been handed to the channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use orbitscrape_crawler::Worker;
use orbitscrape_shared::NoradId;

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    /// Identifiers pushed onto the work queue.
    pub dispatched: u64,
    /// Identifiers whose worker emitted a satellite record.
    pub completed: u64,
    /// Whether the run was cut short by cancellation.
    pub cancelled: bool,
}

/// Launches workers over an identifier range.
pub struct Dispatcher {
    worker: Worker,
    concurrency: usize,
    pacing: Duration,
}

impl Dispatcher {
    /// `pacing` is the minimum delay between two dispatches; zero disables it.
    pub fn new(worker: Worker, concurrency: usize, pacing: Duration) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
            pacing,
        }
    }

    /// Dispatch every identifier in `[start, end]`, then wait for the pool.
    #[instrument(skip_all, fields(start = %start, end = %end, concurrency = self.concurrency))]
    pub async fn run(
        self,
        start: NoradId,
        end: NoradId,
        cancel: CancellationToken,
    ) -> DispatchStats {
        let (queue_tx, queue_rx) = mpsc::channel::<NoradId>(self.concurrency);
        let completed = Arc::new(AtomicU64::new(0));

        let mut join_set = spawn_workers(
            self.worker,
            queue_rx,
            self.concurrency,
            Arc::clone(&completed),
            cancel.clone(),
        );

        let mut pacing = pacing_interval(self.pacing);
        let mut dispatched = 0u64;
        let mut cancelled = false;

        for raw in start.0..=end.0 {
            let id = NoradId(raw);

            if let Some(interval) = pacing.as_mut() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = interval.tick() => {}
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                sent = queue_tx.send(id) => {
                    if sent.is_err() {
                        warn!(norad_id = %id, "worker pool gone, stopping dispatch");
                        break;
                    }
                }
            }

            dispatched += 1;
            debug!(norad_id = %id, "dispatched");
        }

        if cancelled {
            info!(dispatched, "dispatch cancelled, waiting for in-flight workers");
        }

        // Closing the queue lets idle workers exit.
        drop(queue_tx);

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "worker task failed");
            }
        }

        DispatchStats {
            dispatched,
            completed: completed.load(Ordering::Relaxed),
            cancelled,
        }
    }
}

fn pacing_interval(pacing: Duration) -> Option<Interval> {
    if pacing.is_zero() {
        return None;
    }
    let mut interval = tokio::time::interval(pacing);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

fn spawn_workers(
    worker: Worker,
    queue: mpsc::Receiver<NoradId>,
    count: usize,
    completed: Arc<AtomicU64>,
    cancel: CancellationToken,
) -> JoinSet<()> {
    let queue = Arc::new(Mutex::new(queue));

    let mut join_set = JoinSet::new();
    for worker_idx in 0..count {
        let queue = Arc::clone(&queue);
        let worker = worker.clone();
        let completed = Arc::clone(&completed);
        let cancel = cancel.clone();

        join_set.spawn(async move {
            run_worker(worker_idx, queue, worker, completed, cancel).await;
        });
    }

    join_set
}

async fn run_worker(
    worker_idx: usize,
    queue: Arc<Mutex<mpsc::Receiver<NoradId>>>,
    worker: Worker,
    completed: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    loop {
        let Some(id) = next_id(&queue).await else {
            debug!(worker = worker_idx, "worker terminating (queue closed)");
            break;
        };

        if cancel.is_cancelled() {
            debug!(worker = worker_idx, norad_id = %id, "cancelled, skipping queued id");
            continue;
        }

        worker.run(id).await;
        completed.fetch_add(1, Ordering::Relaxed);
    }
}

async fn next_id(queue: &Arc<Mutex<mpsc::Receiver<NoradId>>>) -> Option<NoradId> {
    let mut guard = queue.lock().await;
    guard.recv().await
}
