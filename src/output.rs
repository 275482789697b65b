//! Result types returned by the generation entry points.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// The finished catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOutput {
    /// Complete PDF document, starting with `%PDF`.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    /// One entry per input record, in input order.
    pub images: Vec<ImageOutcome>,
    pub stats: CatalogStats,
}

impl CatalogOutput {
    /// Non-fatal image failures, in row order.
    pub fn image_errors(&self) -> impl Iterator<Item = &ImageError> {
        self.images.iter().filter_map(|o| o.error.as_ref())
    }
}

/// How a row's image reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    /// Fetched and decoded; the card shows the picture.
    Resolved,
    /// Blank or not-a-value reference; placeholder without any fetch.
    NoImage,
    /// Fetch or decode failed; placeholder, see `error`.
    Failed,
}

/// Per-row image resolution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutcome {
    /// 1-indexed row number (0 for the cover logo).
    pub row: usize,
    /// URL actually requested, after share-link rewriting.
    pub url: Option<String>,
    /// Payload size in bytes (0 unless resolved).
    pub bytes: usize,
    pub status: ImageStatus,
    pub error: Option<ImageError>,
}

/// Aggregate numbers for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_records: usize,
    pub categories: usize,
    /// Grid chunks emitted (each holds up to `cards_per_page` cards).
    pub grid_pages: usize,
    pub images_resolved: usize,
    pub images_placeholder: usize,
    pub resolve_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
