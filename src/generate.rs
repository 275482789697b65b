//! Catalog generation entry points.
//!
//! [`generate_with`] is the full pipeline with both collaborators injected;
//! the other functions wire up the defaults ([`HttpImageFetcher`] and
//! [`PdfRenderer`]) or add file I/O around it.

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::output::{CatalogOutput, CatalogStats, ImageStatus};
use crate::pipeline::image::{self, HttpImageFetcher, ImageFetcher, ResolveOptions};
use crate::pipeline::input;
use crate::pipeline::layout::{group_by_category, Block, Cover, LayoutBuilder};
use crate::record::{normalize_all, Record};
use crate::render::{DocumentRenderer, PdfRenderer};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Generate a catalog PDF from in-memory records.
///
/// Images are fetched over HTTP and the document is rendered to A4 PDF.
///
/// # Returns
/// `Ok(CatalogOutput)` even when some or all images degraded to the
/// placeholder (check `output.stats.images_placeholder`).
///
/// # Errors
/// Returns `Err(CatalogError)` only for fatal errors:
/// - No records
/// - The HTTP client could not be built
/// - The PDF backend failed
pub async fn generate(
    records: &[Record],
    config: &CatalogConfig,
) -> Result<CatalogOutput, CatalogError> {
    let fetcher = HttpImageFetcher::new(config.fetch_timeout_secs)?;
    let renderer = PdfRenderer::new(config.title.clone());
    generate_with(records, &fetcher, &renderer, config).await
}

/// Generate a catalog with a caller-supplied fetcher and renderer.
pub async fn generate_with<F, R>(
    records: &[Record],
    fetcher: &F,
    renderer: &R,
    config: &CatalogConfig,
) -> Result<CatalogOutput, CatalogError>
where
    F: ImageFetcher,
    R: DocumentRenderer,
{
    let total_start = Instant::now();
    if records.is_empty() {
        return Err(CatalogError::NoRecords);
    }

    // ── Step 1: Normalise rows ───────────────────────────────────────────
    let products = normalize_all(records);
    let total = products.len();
    info!("Generating catalog for {} records", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(total);
    }

    // ── Step 2: Resolve images ───────────────────────────────────────────
    let resolve_start = Instant::now();
    let logo = match (&config.logo_ref, config.layout.include_logo) {
        (Some(reference), true) => {
            let opts = ResolveOptions::from(config);
            Some(image::resolve(fetcher, 0, reference, &opts).await.image)
        }
        _ => None,
    };
    let resolutions = image::resolve_all(fetcher, &products, config).await;
    let resolve_duration_ms = resolve_start.elapsed().as_millis() as u64;

    let (images, outcomes): (Vec<_>, Vec<_>) = resolutions
        .into_iter()
        .map(|r| (r.image, r.outcome))
        .unzip();
    let images_resolved = outcomes
        .iter()
        .filter(|o| o.status == ImageStatus::Resolved)
        .count();
    info!(
        "Resolved {}/{} images in {}ms",
        images_resolved, total, resolve_duration_ms
    );

    // ── Step 3: Layout ───────────────────────────────────────────────────
    let cover = Cover {
        title: config.title.clone(),
        date: config.cover_date(),
        logo,
    };
    let blocks = LayoutBuilder::new(&config.layout)
        .currency_symbol(&config.currency_symbol)
        .build(&products, &images, &cover);
    let grid_pages = blocks
        .iter()
        .filter(|b| matches!(b, Block::Grid(_)))
        .count();
    let categories = group_by_category(&products).len();
    debug!(
        "Layout: {} blocks, {} categories, {} grid pages",
        blocks.len(),
        categories,
        grid_pages
    );

    // ── Step 4: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let pdf = renderer.render(&blocks)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = CatalogStats {
        total_records: total,
        categories,
        grid_pages,
        images_resolved,
        images_placeholder: total - images_resolved,
        resolve_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Catalog complete: {} bytes, {} records, {}ms total",
        pdf.len(),
        total,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(total, images_resolved);
    }

    Ok(CatalogOutput {
        pdf,
        images: outcomes,
        stats,
    })
}

/// Load records from a path or URL, then [`generate`].
pub async fn generate_from_input(
    input_str: impl AsRef<str>,
    config: &CatalogConfig,
) -> Result<CatalogOutput, CatalogError> {
    let records = input::load_records(input_str.as_ref(), config.download_timeout_secs).await?;
    generate(&records, config).await
}

/// Generate a catalog and write the PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    records: &[Record],
    output_path: impl AsRef<Path>,
    config: &CatalogConfig,
) -> Result<CatalogStats, CatalogError> {
    let output = generate(records, config).await?;
    write_pdf(output_path.as_ref(), &output.pdf).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    records: &[Record],
    config: &CatalogConfig,
) -> Result<CatalogOutput, CatalogError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CatalogError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(records, config))
}

/// Write PDF `bytes` to `path` atomically (temp file + rename), creating
/// parent directories.
pub async fn write_pdf(path: &Path, bytes: &[u8]) -> Result<(), CatalogError> {
    let write_failed = |source: std::io::Error| CatalogError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::image::FetchError;
    use crate::progress::CatalogProgressCallback;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct NoNetwork;

    impl ImageFetcher for NoNetwork {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status(404))
        }
    }

    /// Captures the blocks instead of producing a document.
    #[derive(Default)]
    struct Capture {
        blocks: Mutex<Vec<Block>>,
    }

    impl DocumentRenderer for Capture {
        fn render(&self, blocks: &[Block]) -> Result<Vec<u8>, CatalogError> {
            *self.blocks.lock().unwrap() = blocks.to_vec();
            Ok(b"%PDF-capture".to_vec())
        }
    }

    fn records(values: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(values).unwrap()
    }

    #[tokio::test]
    async fn empty_input_is_fatal() {
        let err = generate_with(&[], &NoNetwork, &Capture::default(), &CatalogConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoRecords));
    }

    #[tokio::test]
    async fn stats_reflect_categories_and_images() {
        let rows = records(json!([
            {"nombre": "Mug", "categoria": "Kitchen", "imagen": "https://example.com/a.png"},
            {"nombre": "Pan", "categoria": "Kitchen"},
            {"name": "Lamp", "Category": "Home"}
        ]));
        let capture = Capture::default();
        let out = generate_with(&rows, &NoNetwork, &capture, &CatalogConfig::default())
            .await
            .unwrap();

        assert_eq!(out.pdf, b"%PDF-capture");
        assert_eq!(out.stats.total_records, 3);
        assert_eq!(out.stats.categories, 2);
        assert_eq!(out.stats.grid_pages, 2);
        assert_eq!(out.stats.images_resolved, 0);
        assert_eq!(out.stats.images_placeholder, 3);
        assert_eq!(out.images.len(), 3);
        assert_eq!(out.images[0].status, ImageStatus::Failed);
        assert_eq!(out.images[1].status, ImageStatus::NoImage);
        assert_eq!(out.image_errors().count(), 1);

        let blocks = capture.blocks.lock().unwrap();
        assert!(blocks.contains(&Block::Banner("Category: Kitchen".into())));
        assert!(blocks.contains(&Block::Banner("Category: Home".into())));
    }

    #[derive(Default)]
    struct Counting {
        started: AtomicUsize,
        completed: AtomicUsize,
    }

    impl CatalogProgressCallback for Counting {
        fn on_generation_start(&self, total_rows: usize) {
            self.started.store(total_rows, Ordering::SeqCst);
        }
        fn on_generation_complete(&self, total_rows: usize, _resolved: usize) {
            self.completed.store(total_rows, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn progress_brackets_the_run() {
        let counter = Arc::new(Counting::default());
        let config = CatalogConfig::builder()
            .progress_callback(counter.clone())
            .build()
            .unwrap();
        let rows = records(json!([{"nombre": "a"}, {"nombre": "b"}]));
        generate_with(&rows, &NoNetwork, &Capture::default(), &config)
            .await
            .unwrap();
        assert_eq!(counter.started.load(Ordering::SeqCst), 2);
        assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_logo_is_left_off_the_cover() {
        let config = CatalogConfig::builder()
            .logo_ref("https://example.com/logo.png")
            .build()
            .unwrap();
        let capture = Capture::default();
        let rows = records(json!([{"nombre": "a"}]));
        generate_with(&rows, &NoNetwork, &capture, &config)
            .await
            .unwrap();
        let blocks = capture.blocks.lock().unwrap();
        assert!(!blocks.iter().any(|b| matches!(b, Block::Image { .. })));
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/catalog.pdf");
        write_pdf(&path, b"%PDF-1.3").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
