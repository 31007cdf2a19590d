//! Application configuration for orbitscrape.
//!
//! User config lives at `~/.orbitscrape/orbitscrape.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OrbitScrapeError, Result};
use crate::types::NoradId;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "orbitscrape.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".orbitscrape";

/// Placeholder substituted with the identifier in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

// ---------------------------------------------------------------------------
// Config structs (matching orbitscrape.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Run defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote catalog endpoints.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root of the output store.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// First identifier of the crawl range.
    #[serde(default)]
    pub start_id: u32,

    /// Last identifier of the crawl range (inclusive).
    #[serde(default = "default_end_id")]
    pub end_id: u32,

    /// Number of concurrent workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum ms between two identifier dispatches.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            start_id: 0,
            end_id: default_end_id(),
            concurrency: default_concurrency(),
            pacing_ms: default_pacing_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_output_dir() -> String {
    "descriptions".into()
}
fn default_end_id() -> u32 {
    53_000
}
fn default_concurrency() -> u32 {
    16
}
fn default_pacing_ms() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    30
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog site root; category links are resolved against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Detail page path template, relative to `base_url`.
    #[serde(default = "default_detail_path")]
    pub detail_path: String,

    /// Host of the external description pages linked from detail pages.
    #[serde(default = "default_description_domain")]
    pub description_domain: String,

    /// Absolute thumbnail URL template.
    #[serde(default = "default_thumbnail_url")]
    pub thumbnail_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            detail_path: default_detail_path(),
            description_domain: default_description_domain(),
            thumbnail_url: default_thumbnail_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.n2yo.com".into()
}
fn default_detail_path() -> String {
    "/satellite/?s={id}#results".into()
}
fn default_description_domain() -> String {
    "nssdc.gsfc.nasa.gov".into()
}
fn default_thumbnail_url() -> String {
    "https://static.n2yo.com/img/satellites/{id}.jpg".into()
}

// ---------------------------------------------------------------------------
// Ingest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// First identifier, inclusive.
    pub start: NoradId,
    /// Last identifier, inclusive.
    pub end: NoradId,
    /// Output store root.
    pub output_dir: PathBuf,
    /// Worker pool size.
    pub concurrency: u32,
    /// Minimum delay between dispatches in ms.
    pub pacing_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Catalog endpoints.
    pub catalog: CatalogConfig,
}

impl From<&AppConfig> for IngestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            start: NoradId(config.defaults.start_id),
            end: NoradId(config.defaults.end_id),
            output_dir: PathBuf::from(&config.defaults.output_dir),
            concurrency: config.defaults.concurrency,
            pacing_ms: config.defaults.pacing_ms,
            request_timeout_secs: config.defaults.request_timeout_secs,
            catalog: config.catalog.clone(),
        }
    }
}

impl IngestConfig {
    /// Pacing interval as a `Duration`.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Number of identifiers in the inclusive range.
    pub fn range_len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            u64::from(self.end.0 - self.start.0) + 1
        }
    }

    /// Check the range, pool size and URL templates.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(OrbitScrapeError::config(format!(
                "start id {} is greater than end id {}",
                self.start, self.end
            )));
        }
        if self.concurrency == 0 {
            return Err(OrbitScrapeError::config("concurrency must be at least 1"));
        }

        let base = Url::parse(&self.catalog.base_url).map_err(|e| {
            OrbitScrapeError::config(format!("invalid base_url '{}': {e}", self.catalog.base_url))
        })?;

        for (name, template) in [
            ("detail_path", &self.catalog.detail_path),
            ("thumbnail_url", &self.catalog.thumbnail_url),
        ] {
            if !template.contains(ID_PLACEHOLDER) {
                return Err(OrbitScrapeError::config(format!(
                    "{name} '{template}' has no {ID_PLACEHOLDER} placeholder"
                )));
            }
        }

        base.join(&self.catalog.detail_path.replace(ID_PLACEHOLDER, "0"))
            .map_err(|e| OrbitScrapeError::config(format!("invalid detail_path: {e}")))?;
        Url::parse(&self.catalog.thumbnail_url.replace(ID_PLACEHOLDER, "0"))
            .map_err(|e| OrbitScrapeError::config(format!("invalid thumbnail_url: {e}")))?;

        if self.catalog.description_domain.trim().is_empty() {
            return Err(OrbitScrapeError::config("description_domain must not be empty"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.orbitscrape/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OrbitScrapeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.orbitscrape/orbitscrape.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OrbitScrapeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        OrbitScrapeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OrbitScrapeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OrbitScrapeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OrbitScrapeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
