//! Core domain types for crawled catalog records.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NoradId
// ---------------------------------------------------------------------------

/// The catalog's numeric key for an orbiting object or a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoradId(pub u32);

impl std::fmt::Display for NoradId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NoradId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<u32> for NoradId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Everything a worker learned about one satellite.
///
/// Built by exactly one worker and handed to the aggregator fully formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteRecord {
    pub id: NoradId,
    /// Joined description paragraphs. Empty when the description was already
    /// persisted or could not be fetched.
    pub description: String,
    /// Category ids in the order they appear on the detail page.
    pub category_ids: Vec<NoradId>,
    /// Basenames of images this worker sent to the aggregator.
    pub images: Vec<String>,
}

impl SatelliteRecord {
    /// An empty record for `id`.
    pub fn new(id: NoradId) -> Self {
        Self {
            id,
            description: String::new(),
            category_ids: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Category ids as a single comma-separated line, e.g. `4,11`.
    pub fn category_line(&self) -> String {
        self.category_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A category id with its fetched description text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: NoradId,
    pub description: String,
}

/// An image payload, keyed by owning satellite and basename.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub owner: NoradId,
    pub basename: String,
    pub payload: Vec<u8>,
}

impl std::fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRecord")
            .field("owner", &self.owner)
            .field("basename", &self.basename)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norad_id_parses_and_displays() {
        let id: NoradId = "25544".parse().expect("parse id");
        assert_eq!(id, NoradId(25544));
        assert_eq!(id.to_string(), "25544");
        assert!("ISS".parse::<NoradId>().is_err());
    }

    #[test]
    fn category_line_keeps_discovery_order() {
        let mut sat = SatelliteRecord::new(NoradId(25544));
        assert_eq!(sat.category_line(), "");

        sat.category_ids = vec![NoradId(4), NoradId(11)];
        assert_eq!(sat.category_line(), "4,11");
    }

    #[test]
    fn image_debug_omits_payload() {
        let image = ImageRecord {
            owner: NoradId(5),
            basename: "5.jpg".into(),
            payload: vec![0xff; 2048],
        };
        let rendered = format!("{image:?}");
        assert!(rendered.contains("payload_len: 2048"));
        assert!(!rendered.contains("255"));
    }
}
