//! Deduplication of category and image fetches across workers.
//!
//! The store answers "is it persisted?". The oracle adds a per-run claim set so
//! that two workers cannot both decide to fetch the same category or image in
//! the window between the check and the aggregator's write. Claims are released
//! once the write lands, so the sets only hold work that is still in flight.

use std::collections::HashSet;

use tokio::sync::Mutex;
use tracing::trace;

use orbitscrape_shared::NoradId;
use orbitscrape_storage::Store;

/// Existence checks plus atomic "claim this for fetching".
#[derive(Debug)]
pub struct DedupOracle {
    store: Store,
    claimed_categories: Mutex<HashSet<NoradId>>,
    claimed_images: Mutex<HashSet<(NoradId, String)>>,
}

impl DedupOracle {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            claimed_categories: Mutex::new(HashSet::new()),
            claimed_images: Mutex::new(HashSet::new()),
        }
    }

    pub async fn category_exists(&self, id: NoradId) -> bool {
        self.store.category_exists(id).await
    }

    pub async fn satellite_description_exists(&self, id: NoradId) -> bool {
        self.store.satellite_description_exists(id).await
    }

    pub async fn image_exists(&self, owner: NoradId, basename: &str) -> bool {
        self.store.image_exists(owner, basename).await
    }

    /// Claim category `id` for fetching.
    ///
    /// Returns `false` if it is already persisted or claimed by another worker.
    pub async fn claim_category(&self, id: NoradId) -> bool {
        let mut claimed = self.claimed_categories.lock().await;
        if claimed.contains(&id) || self.store.category_exists(id).await {
            trace!(category_id = %id, "category already claimed or persisted");
            return false;
        }
        claimed.insert(id)
    }

    /// Drop the claim on category `id` once it is persisted.
    pub async fn release_category(&self, id: NoradId) {
        self.claimed_categories.lock().await.remove(&id);
    }

    /// Claim image `basename` of `owner` for fetching.
    pub async fn claim_image(&self, owner: NoradId, basename: &str) -> bool {
        let key = (owner, basename.to_string());
        let mut claimed = self.claimed_images.lock().await;
        if claimed.contains(&key) || self.store.image_exists(owner, basename).await {
            trace!(norad_id = %owner, basename, "image already claimed or persisted");
            return false;
        }
        claimed.insert(key)
    }

    /// Number of claims currently held.
    pub async fn pending_claims(&self) -> usize {
        self.claimed_categories.lock().await.len() + self.claimed_images.lock().await.len()
    }

    /// Drop an image claim after a failed fetch or once the image is persisted.
    pub async fn release_image(&self, owner: NoradId, basename: &str) {
        self.claimed_images
            .lock()
            .await
            .remove(&(owner, basename.to_string()));
    }
}
