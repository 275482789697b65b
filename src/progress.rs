//! Progress-callback trait for per-image resolution events.
//!
//! Inject an [`Arc<dyn CatalogProgressCallback>`] via
//! [`crate::config::CatalogConfigBuilder::progress_callback`] to receive
//! events while product images are fetched. Image resolution is the only
//! slow stage of a generation; layout and rendering finish in milliseconds.
//!
//! # Example
//!
//! ```rust
//! use sheet2catalog::{CatalogConfig, CatalogProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: Arc<AtomicUsize>,
//! }
//!
//! impl CatalogProgressCallback for CountingCallback {
//!     fn on_image_failed(&self, row: usize, total: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("row {row}/{total}: {error}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     failed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = CatalogConfig::builder()
//!     .progress_callback(counter as Arc<dyn CatalogProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline as it resolves each product image.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-image methods are called from concurrently polled futures, in
/// completion order. All methods default to no-ops.
pub trait CatalogProgressCallback: Send + Sync {
    /// Called once before any image is resolved.
    fn on_generation_start(&self, total_rows: usize) {
        let _ = total_rows;
    }

    /// Called just before a row's image is fetched.
    ///
    /// Rows whose reference is blank skip straight to the placeholder and
    /// produce no start event.
    fn on_image_start(&self, row: usize, total_rows: usize) {
        let _ = (row, total_rows);
    }

    /// Called when a row's image was fetched and decoded.
    ///
    /// * `bytes`: size of the downloaded payload
    fn on_image_resolved(&self, row: usize, total_rows: usize, bytes: usize) {
        let _ = (row, total_rows, bytes);
    }

    /// Called when a row's image degraded to the placeholder.
    fn on_image_failed(&self, row: usize, total_rows: usize, error: &str) {
        let _ = (row, total_rows, error);
    }

    /// Called once after the PDF bytes were produced.
    ///
    /// * `resolved`: rows that show a real picture
    fn on_generation_complete(&self, total_rows: usize, resolved: usize) {
        let _ = (total_rows, resolved);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CatalogProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CatalogConfig`].
pub type ProgressCallback = Arc<dyn CatalogProgressCallback>;
