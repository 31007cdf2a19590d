//! HTTP fetching against the catalog, description and thumbnail hosts.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use orbitscrape_shared::{
    CatalogConfig, ID_PLACEHOLDER, NoradId, OrbitScrapeError, Result,
};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("orbitscrape/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Shared HTTP client plus the URL conventions of the catalog.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    detail_path: String,
    thumbnail_url: String,
    description_domain: String,
}

impl HttpFetcher {
    /// Build a fetcher for the given catalog endpoints.
    pub fn new(catalog: &CatalogConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| OrbitScrapeError::Transport(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&catalog.base_url).map_err(|e| {
            OrbitScrapeError::config(format!("invalid base_url '{}': {e}", catalog.base_url))
        })?;

        Ok(Self {
            client,
            base_url,
            detail_path: catalog.detail_path.clone(),
            thumbnail_url: catalog.thumbnail_url.clone(),
            description_domain: catalog.description_domain.clone(),
        })
    }

    /// Catalog site root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Host of external description pages.
    pub fn description_domain(&self) -> &str {
        &self.description_domain
    }

    // -----------------------------------------------------------------------
    // URL builders
    // -----------------------------------------------------------------------

    /// Detail page of one object.
    pub fn detail_url(&self, id: NoradId) -> Result<Url> {
        let path = self.detail_path.replace(ID_PLACEHOLDER, &id.to_string());
        self.base_url
            .join(&path)
            .map_err(|e| OrbitScrapeError::extraction(format!("bad detail url '{path}': {e}")))
    }

    /// Category page for a link found on a detail page.
    pub fn category_url(&self, href: &str) -> Result<Url> {
        self.base_url
            .join(href)
            .map_err(|e| OrbitScrapeError::extraction(format!("bad category href '{href}': {e}")))
    }

    /// Fixed-convention thumbnail of one object.
    pub fn thumbnail_url(&self, id: NoradId) -> Result<Url> {
        let raw = self.thumbnail_url.replace(ID_PLACEHOLDER, &id.to_string());
        Url::parse(&raw)
            .map_err(|e| OrbitScrapeError::extraction(format!("bad thumbnail url '{raw}': {e}")))
    }

    // -----------------------------------------------------------------------
    // Fetching
    // -----------------------------------------------------------------------

    /// Fetch a page body as text.
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| OrbitScrapeError::Transport(format!("{url}: body read failed: {e}")))
    }

    /// Fetch a binary payload.
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| OrbitScrapeError::Transport(format!("{url}: body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| OrbitScrapeError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(OrbitScrapeError::not_found(url.as_str()));
        }
        if !status.is_success() {
            return Err(OrbitScrapeError::Transport(format!("{url}: HTTP {status}")));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_for(base: &str) -> CatalogConfig {
        CatalogConfig {
            base_url: base.to_string(),
            detail_path: "/satellite/?s={id}#results".into(),
            description_domain: "nssdc.gsfc.nasa.gov".into(),
            thumbnail_url: format!("{base}/thumbs/{{id}}.jpg"),
        }
    }

    #[test]
    fn builds_catalog_urls() {
        let fetcher =
            HttpFetcher::new(&catalog_for("https://www.n2yo.com"), Duration::from_secs(5)).unwrap();

        let detail = fetcher.detail_url(NoradId(25544)).unwrap();
        assert_eq!(detail.as_str(), "https://www.n2yo.com/satellite/?s=25544#results");

        let category = fetcher.category_url("/satellites/?c=11").unwrap();
        assert_eq!(category.as_str(), "https://www.n2yo.com/satellites/?c=11");

        let thumb = fetcher.thumbnail_url(NoradId(99999)).unwrap();
        assert_eq!(thumb.as_str(), "https://www.n2yo.com/thumbs/99999.jpg");
    }

    #[tokio::test]
    async fn not_found_is_reported_separately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thumbs/99999.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thumbs/500.jpg"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&catalog_for(&server.uri()), Duration::from_secs(5)).unwrap();

        let err = fetcher
            .fetch_bytes(&fetcher.thumbnail_url(NoradId(99999)).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = fetcher
            .fetch_bytes(&fetcher.thumbnail_url(NoradId(500)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, OrbitScrapeError::Transport(_)));
    }

    #[tokio::test]
    async fn fetches_text_and_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/satellite/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/thumbs/5.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&catalog_for(&server.uri()), Duration::from_secs(5)).unwrap();

        let body = fetcher
            .fetch_text(&fetcher.detail_url(NoradId(5)).unwrap())
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");

        let bytes = fetcher
            .fetch_bytes(&fetcher.thumbnail_url(NoradId(5)).unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8, 0xff]);
    }
}
