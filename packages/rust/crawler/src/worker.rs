//! Per-identifier fetch-and-extract sequence.
//!
//! A [`Worker`] turns one identifier into a [`SatelliteRecord`] plus any number
//! of category and image results, all sent to the aggregator over channels.
//! Every failure is logged and treated as an empty result for that sub-item.

use std::sync::Arc;

use scraper::Html;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use url::Url;

use orbitscrape_shared::{CategoryRecord, ImageRecord, NoradId, Result, SatelliteRecord};

use crate::extract::{
    MainPage, extract_category_page, extract_description_page, extract_main, image_basename,
};
use crate::fetch::HttpFetcher;
use crate::oracle::DedupOracle;

/// Sending halves of the three result channels.
#[derive(Debug, Clone)]
pub struct ResultSenders {
    pub categories: mpsc::Sender<CategoryRecord>,
    pub satellites: mpsc::Sender<SatelliteRecord>,
    pub images: mpsc::Sender<ImageRecord>,
}

/// Receiving halves of the three result channels.
#[derive(Debug)]
pub struct ResultReceivers {
    pub categories: mpsc::Receiver<CategoryRecord>,
    pub satellites: mpsc::Receiver<SatelliteRecord>,
    pub images: mpsc::Receiver<ImageRecord>,
}

/// Create the three result channels, each with the given capacity.
pub fn result_channels(capacity: usize) -> (ResultSenders, ResultReceivers) {
    let capacity = capacity.max(1);
    let (cat_tx, cat_rx) = mpsc::channel(capacity);
    let (sat_tx, sat_rx) = mpsc::channel(capacity);
    let (img_tx, img_rx) = mpsc::channel(capacity);
    (
        ResultSenders {
            categories: cat_tx,
            satellites: sat_tx,
            images: img_tx,
        },
        ResultReceivers {
            categories: cat_rx,
            satellites: sat_rx,
            images: img_rx,
        },
    )
}

/// Fetches and extracts everything known about one identifier at a time.
///
/// Clones share the HTTP client, the oracle and the channels.
#[derive(Debug, Clone)]
pub struct Worker {
    fetcher: HttpFetcher,
    oracle: Arc<DedupOracle>,
    results: ResultSenders,
}

impl Worker {
    pub fn new(fetcher: HttpFetcher, oracle: Arc<DedupOracle>, results: ResultSenders) -> Self {
        Self {
            fetcher,
            oracle,
            results,
        }
    }

    /// Process `id` and emit its satellite record. This is the terminal step
    /// for the identifier.
    #[instrument(skip_all, fields(norad_id = %id))]
    pub async fn run(&self, id: NoradId) {
        let record = self.collect(id).await;
        if self.results.satellites.send(record).await.is_err() {
            warn!("aggregator gone, satellite record dropped");
        }
    }

    /// Build the satellite record for `id`, sending category and image
    /// results along the way.
    pub async fn collect(&self, id: NoradId) -> SatelliteRecord {
        let mut record = SatelliteRecord::new(id);

        let main = match self.fetch_main(id).await {
            Ok(main) => main,
            Err(e) => {
                debug!(error = %e, "detail page unavailable");
                return record;
            }
        };

        for category in &main.categories {
            let category_id = category.id().unwrap_or_else(|e| {
                debug!(error = %e, "using category id 0");
                NoradId(0)
            });

            if self.oracle.claim_category(category_id).await {
                self.ingest_category(category_id, &category.href).await;
            }
            record.category_ids.push(category_id);
        }

        if self.oracle.satellite_description_exists(id).await {
            debug!("description already persisted, skipping");
        } else if let Some(url) = &main.description_url {
            self.ingest_description(&mut record, url).await;
        }

        self.ingest_thumbnail(&mut record).await;

        record
    }

    async fn fetch_main(&self, id: NoradId) -> Result<MainPage> {
        let url = self.fetcher.detail_url(id)?;
        let body = self.fetcher.fetch_text(&url).await?;

        let doc = Html::parse_document(&body);
        Ok(extract_main(&doc, self.fetcher.description_domain()))
    }

    async fn ingest_category(&self, id: NoradId, href: &str) {
        let fetched = match self.fetcher.category_url(href) {
            Ok(url) => self.fetcher.fetch_text(&url).await,
            Err(e) => Err(e),
        };

        // An unavailable page still settles the category with an empty description.
        let description = match fetched {
            Ok(body) => {
                let doc = Html::parse_document(&body);
                extract_category_page(&doc)
            }
            Err(e) => {
                debug!(category_id = %id, error = %e, "category page unavailable");
                String::new()
            }
        };

        debug!(category_id = %id, bytes = description.len(), "category description extracted");
        if self
            .results
            .categories
            .send(CategoryRecord { id, description })
            .await
            .is_err()
        {
            warn!(category_id = %id, "aggregator gone, category dropped");
        }
    }

    async fn ingest_description(&self, record: &mut SatelliteRecord, url: &Url) {
        let body = match self.fetcher.fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(%url, error = %e, "description page unavailable");
                return;
            }
        };

        let page = {
            let doc = Html::parse_document(&body);
            extract_description_page(&doc, url)
        };

        record.description = page.description();
        debug!(
            paragraphs = page.paragraphs.len(),
            images = page.image_urls.len(),
            "description extracted"
        );

        for image_url in &page.image_urls {
            match image_basename(image_url) {
                Some(basename) => self.ingest_image(record, image_url, basename).await,
                None => debug!(url = %image_url, "image url has no basename"),
            }
        }
    }

    async fn ingest_thumbnail(&self, record: &mut SatelliteRecord) {
        let url = match self.fetcher.thumbnail_url(record.id) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "no thumbnail url");
                return;
            }
        };

        if let Some(basename) = image_basename(&url) {
            self.ingest_image(record, &url, basename).await;
        }
    }

    async fn ingest_image(&self, record: &mut SatelliteRecord, url: &Url, basename: String) {
        let owner = record.id;
        if !self.oracle.claim_image(owner, &basename).await {
            return;
        }

        let payload = match self.fetcher.fetch_bytes(url).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => {
                debug!(%url, "image not found");
                self.oracle.release_image(owner, &basename).await;
                return;
            }
            Err(e) => {
                debug!(%url, error = %e, "image unavailable");
                self.oracle.release_image(owner, &basename).await;
                return;
            }
        };

        let image = ImageRecord {
            owner,
            basename: basename.clone(),
            payload,
        };
        if self.results.images.send(image).await.is_err() {
            warn!(%basename, "aggregator gone, image dropped");
            return;
        }
        record.images.push(basename);
    }
}
