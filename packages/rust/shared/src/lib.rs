//! Shared types, error model, and configuration for orbitscrape.
//!
//! This crate is the foundation depended on by all other orbitscrape crates.
//! It provides:
//! - [`OrbitScrapeError`] — the unified error type
//! - Domain types ([`NoradId`], [`SatelliteRecord`], [`CategoryRecord`], [`ImageRecord`])
//! - Configuration ([`AppConfig`], [`IngestConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, DefaultsConfig, ID_PLACEHOLDER, IngestConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{OrbitScrapeError, Result};
pub use types::{CategoryRecord, ImageRecord, NoradId, SatelliteRecord};
