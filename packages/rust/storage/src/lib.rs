//! Directory-based output store.
//!
//! The [`Store`] keeps one directory per record kind under a root:
//!
//! ```text
//! <root>/categories/<category id>           category description
//! <root>/satellites/<norad id>              satellite description
//! <root>/satellites/<norad id>-categories   comma-separated category ids
//! <root>/images/<norad id>/<basename>       image payload
//! ```
//!
//! **Access rules:**
//! - The aggregator is the sole writer.
//! - Workers only call the existence predicates.
//!
//! Every write goes to a temporary sibling first and is renamed into place, so a
//! record path either holds its final content or does not exist.

use std::path::{Path, PathBuf};

use orbitscrape_shared::{CategoryRecord, ImageRecord, NoradId, OrbitScrapeError, Result};
use tracing::debug;

const CATEGORIES_DIR: &str = "categories";
const SATELLITES_DIR: &str = "satellites";
const IMAGES_DIR: &str = "images";

/// Suffix of the per-satellite category list file.
const CATEGORY_LIST_SUFFIX: &str = "-categories";

/// Handle to an output store rooted at a directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open a store at `root`, creating the per-kind directories if missing.
    pub async fn open(root: &Path) -> Result<Self> {
        for dir in [CATEGORIES_DIR, SATELLITES_DIR, IMAGES_DIR] {
            let path = root.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| OrbitScrapeError::io(&path, e))?;
        }

        debug!(root = %root.display(), "opened output store");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    pub fn category_path(&self, id: NoradId) -> PathBuf {
        self.root.join(CATEGORIES_DIR).join(id.to_string())
    }

    pub fn satellite_description_path(&self, id: NoradId) -> PathBuf {
        self.root.join(SATELLITES_DIR).join(id.to_string())
    }

    pub fn satellite_categories_path(&self, id: NoradId) -> PathBuf {
        self.root
            .join(SATELLITES_DIR)
            .join(format!("{id}{CATEGORY_LIST_SUFFIX}"))
    }

    pub fn image_dir(&self, owner: NoradId) -> PathBuf {
        self.root.join(IMAGES_DIR).join(owner.to_string())
    }

    pub fn image_path(&self, owner: NoradId, basename: &str) -> PathBuf {
        self.image_dir(owner).join(basename)
    }

    // -----------------------------------------------------------------------
    // Existence predicates
    // -----------------------------------------------------------------------

    /// Whether a description for category `id` is persisted.
    pub async fn category_exists(&self, id: NoradId) -> bool {
        exists(&self.category_path(id)).await
    }

    /// Whether a description for satellite `id` is persisted.
    pub async fn satellite_description_exists(&self, id: NoradId) -> bool {
        exists(&self.satellite_description_path(id)).await
    }

    /// Whether the image `basename` owned by `owner` is persisted.
    pub async fn image_exists(&self, owner: NoradId, basename: &str) -> bool {
        if !is_safe_basename(basename) {
            return false;
        }
        exists(&self.image_path(owner, basename)).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn write_category(&self, record: &CategoryRecord) -> Result<()> {
        write_atomic(&self.category_path(record.id), record.description.as_bytes()).await
    }

    pub async fn write_satellite_description(&self, id: NoradId, description: &str) -> Result<()> {
        write_atomic(&self.satellite_description_path(id), description.as_bytes()).await
    }

    pub async fn write_satellite_categories(&self, id: NoradId, line: &str) -> Result<()> {
        write_atomic(&self.satellite_categories_path(id), line.as_bytes()).await
    }

    /// Persist an image, creating the owner's directory on first use.
    pub async fn write_image(&self, image: &ImageRecord) -> Result<()> {
        if !is_safe_basename(&image.basename) {
            return Err(OrbitScrapeError::Storage(format!(
                "refusing image basename '{}' for {}",
                image.basename, image.owner
            )));
        }

        let dir = self.image_dir(image.owner);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| OrbitScrapeError::io(&dir, e))?;

        write_atomic(&dir.join(&image.basename), &image.payload).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn read_category(&self, id: NoradId) -> Result<String> {
        read_string(&self.category_path(id)).await
    }

    pub async fn read_satellite_description(&self, id: NoradId) -> Result<String> {
        read_string(&self.satellite_description_path(id)).await
    }

    /// Read back the category list of a satellite, in stored order.
    pub async fn read_satellite_categories(&self, id: NoradId) -> Result<Vec<NoradId>> {
        let line = read_string(&self.satellite_categories_path(id)).await?;
        line.split(',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.trim().parse().map_err(|e| {
                    OrbitScrapeError::Storage(format!("bad category id '{s}' for {id}: {e}"))
                })
            })
            .collect()
    }
}

/// A basename is a single, non-special path component.
fn is_safe_basename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn read_string(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| OrbitScrapeError::io(path, e))
}

/// Write `bytes` to a hidden temporary sibling, then rename it over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| OrbitScrapeError::Storage(format!("no file name in {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| OrbitScrapeError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| OrbitScrapeError::io(path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote record");
    Ok(())
}
