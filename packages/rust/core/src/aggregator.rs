//! Single writer for everything the workers produce.
//!
//! The aggregator multiplexes the category, satellite and image channels and is
//! the only component that writes to the [`Store`]. Each successful write
//! releases the matching oracle claim. It stops once every sender is gone.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use orbitscrape_crawler::{DedupOracle, ResultReceivers};
use orbitscrape_shared::{CategoryRecord, ImageRecord, SatelliteRecord};
use orbitscrape_storage::Store;

use crate::pipeline::ProgressReporter;

/// Counts of what the aggregator persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStats {
    pub categories_written: u64,
    pub satellites_received: u64,
    pub descriptions_written: u64,
    pub category_lists_written: u64,
    pub images_written: u64,
    pub write_failures: u64,
}

/// Drains result channels into the store.
pub struct Aggregator {
    store: Store,
    oracle: Arc<DedupOracle>,
    expected: u64,
    stats: AggregateStats,
}

impl Aggregator {
    /// `expected` is the number of satellites the run should produce, for progress.
    pub fn new(store: Store, oracle: Arc<DedupOracle>, expected: u64) -> Self {
        Self {
            store,
            oracle,
            expected,
            stats: AggregateStats::default(),
        }
    }

    /// Receive and persist until all three channels are closed.
    pub async fn run(
        mut self,
        mut results: ResultReceivers,
        progress: &dyn ProgressReporter,
    ) -> AggregateStats {
        loop {
            tokio::select! {
                Some(category) = results.categories.recv() => {
                    self.persist_category(category).await;
                }
                Some(satellite) = results.satellites.recv() => {
                    let id = satellite.id;
                    self.persist_satellite(satellite).await;
                    progress.satellite_stored(id, self.stats.satellites_received, self.expected);
                }
                Some(image) = results.images.recv() => {
                    self.persist_image(image).await;
                }
                else => break,
            }
        }

        debug!(stats = ?self.stats, "aggregator drained");
        self.stats
    }

    async fn persist_category(&mut self, category: CategoryRecord) {
        match self.store.write_category(&category).await {
            Ok(()) => {
                self.stats.categories_written += 1;
                self.oracle.release_category(category.id).await;
                info!(category_id = %category.id, "received category");
            }
            Err(e) => {
                self.stats.write_failures += 1;
                warn!(category_id = %category.id, error = %e, "failed to store category");
            }
        }
    }

    async fn persist_satellite(&mut self, satellite: SatelliteRecord) {
        self.stats.satellites_received += 1;
        let id = satellite.id;
        info!(norad_id = %id, "received satellite");

        // An empty description means "already stored" or "nothing online"; both are skipped.
        if satellite.description.is_empty() {
            debug!(norad_id = %id, "description exists on disk or not online, not saving");
        } else {
            match self
                .store
                .write_satellite_description(id, &satellite.description)
                .await
            {
                Ok(()) => {
                    self.stats.descriptions_written += 1;
                    debug!(norad_id = %id, "loaded description");
                }
                Err(e) => {
                    self.stats.write_failures += 1;
                    warn!(norad_id = %id, error = %e, "failed to store description");
                }
            }
        }

        if satellite.category_ids.is_empty() {
            debug!(norad_id = %id, "no categories");
            return;
        }

        let line = satellite.category_line();
        match self.store.write_satellite_categories(id, &line).await {
            Ok(()) => {
                self.stats.category_lists_written += 1;
                debug!(norad_id = %id, categories = %line, "stored categories");
            }
            Err(e) => {
                self.stats.write_failures += 1;
                warn!(norad_id = %id, error = %e, "failed to store categories");
            }
        }
    }

    async fn persist_image(&mut self, image: ImageRecord) {
        match self.store.write_image(&image).await {
            Ok(()) => {
                self.stats.images_written += 1;
                self.oracle.release_image(image.owner, &image.basename).await;
                debug!(norad_id = %image.owner, basename = %image.basename, bytes = image.payload.len(), "stored image");
            }
            Err(e) => {
                self.stats.write_failures += 1;
                warn!(norad_id = %image.owner, basename = %image.basename, error = %e, "failed to store image");
            }
        }
    }
}
