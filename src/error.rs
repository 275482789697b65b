//! Error types for the sheet2catalog library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CatalogError`]: **Fatal**: the catalog cannot be produced at all
//!   (record file missing, malformed rows, invalid configuration, the PDF
//!   backend failed). Returned as `Err(CatalogError)` from the top-level
//!   `generate*` functions.
//!
//! * [`ImageError`]: **Non-fatal**: a single product image could not be
//!   resolved (bad URL, HTTP 404, timeout, undecodable bytes). The row is
//!   rendered with the placeholder box and the error is kept in
//!   [`crate::output::ImageOutcome`] so callers can report it afterwards.
//!
//! A catalog where every image degraded to the placeholder is still a
//! successful generation.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sheet2catalog library.
///
/// Per-image failures use [`ImageError`] and never surface here.
#[derive(Debug, Error)]
pub enum CatalogError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Record file was not found at the given path.
    #[error("Records file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The record source was read but is not an array of JSON objects.
    #[error("Malformed records in '{source_name}': {detail}")]
    MalformedRecords { source_name: String, detail: String },

    /// The record source is empty; there is nothing to put in a catalog.
    #[error("No product records found; the sheet is empty")]
    NoRecords,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The PDF backend rejected the document.
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single product image.
///
/// Stored in [`crate::output::ImageOutcome`]; the affected card shows the
/// placeholder box instead of the picture.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The reference is not something we know how to fetch.
    #[error("Row {row}: unsupported image reference '{reference}'")]
    UnsupportedReference { row: usize, reference: String },

    /// The server answered with a non-success status.
    #[error("Row {row}: HTTP {status} for '{url}'")]
    HttpStatus { row: usize, url: String, status: u16 },

    /// Connection, TLS or body-read failure.
    #[error("Row {row}: transport error for '{url}': {detail}")]
    Transport {
        row: usize,
        url: String,
        detail: String,
    },

    /// The fetch exceeded its per-image timeout.
    #[error("Row {row}: image fetch timed out after {secs}s for '{url}'")]
    Timeout { row: usize, url: String, secs: u64 },

    /// Bytes arrived but are not a decodable image.
    #[error("Row {row}: image could not be decoded: {detail}")]
    Decode { row: usize, detail: String },
}

impl ImageError {
    /// 1-indexed row the error belongs to.
    pub fn row(&self) -> usize {
        match self {
            ImageError::UnsupportedReference { row, .. }
            | ImageError::HttpStatus { row, .. }
            | ImageError::Transport { row, .. }
            | ImageError::Timeout { row, .. }
            | ImageError::Decode { row, .. } => *row,
        }
    }
}
