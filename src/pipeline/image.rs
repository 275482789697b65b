//! Image resolution: product image reference → picture or placeholder.
//!
//! This is the only stage with network I/O. It runs before layout so the
//! layout builder stays pure: by the time cards are built every row already
//! holds either decoded pixels or [`ResolvedImage::Placeholder`].
//!
//! ## Degrade, never fail
//!
//! A broken link in row 40 must not cost the user the other 39 cards. Every
//! failure (bad reference, HTTP error, timeout, undecodable payload) turns
//! into the placeholder plus a non-fatal [`ImageError`] in the row's
//! [`ImageOutcome`]. No function in this module returns `Err`.
//!
//! ## Google Drive share links
//!
//! Sheet owners paste the "share" URL of a Drive file, which serves an HTML
//! viewer instead of the picture. [`rewrite_share_link`] extracts the file id
//! and points at the direct-content endpoint instead.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, ImageError};
use crate::output::{ImageOutcome, ImageStatus};
use crate::pipeline::decode::{decode_image, RasterImage};
use crate::pipeline::input::is_url;
use crate::progress::CatalogProgressCallback;
use crate::record::ProductRecord;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Text a spreadsheet export writes for an empty numeric cell.
const NOT_A_VALUE: &str = "nan";

const DRIVE_HOST: &str = "drive.google.com";

static RE_DRIVE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([^/?#&]+)").expect("valid regex"));

static RE_DRIVE_QUERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([^&#]+)").expect("valid regex"));

/// A row's image after resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedImage {
    Image(Arc<RasterImage>),
    /// Grey "Image not available" box of the same size.
    Placeholder,
}

impl ResolvedImage {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ResolvedImage::Placeholder)
    }
}

/// What an image reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Blank or not-a-value text; no fetch is attempted.
    Absent,
    /// HTTP/HTTPS URL, already rewritten if it was a share link.
    Remote(String),
    /// `data:` URI carrying the bytes inline.
    Inline(String),
    /// Anything else (a bare file name, a typo).
    Unsupported(String),
}

/// Classify a raw reference without touching the network.
pub fn classify(image_ref: &str) -> ImageSource {
    let r = image_ref.trim();
    if r.is_empty() || r.eq_ignore_ascii_case(NOT_A_VALUE) {
        return ImageSource::Absent;
    }
    if r.starts_with("data:") {
        return ImageSource::Inline(r.to_string());
    }
    if is_url(r) {
        return ImageSource::Remote(rewrite_share_link(&lowercase_scheme(r)));
    }
    ImageSource::Unsupported(r.to_string())
}

fn lowercase_scheme(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => format!("{}://{rest}", scheme.to_ascii_lowercase()),
        None => url.to_string(),
    }
}

/// Rewrite a Drive share link to its direct-content URL.
///
/// The id is taken from `/d/<id>/…` first, then from `?id=<id>` / `&id=<id>`.
/// Non-Drive URLs and Drive URLs without a recognisable id are returned
/// unchanged. Applying the rewrite twice gives the same URL.
pub fn rewrite_share_link(url: &str) -> String {
    if !url.to_ascii_lowercase().contains(DRIVE_HOST) {
        return url.to_string();
    }
    match drive_file_id(url) {
        Some(id) => format!("https://{DRIVE_HOST}/uc?export=view&id={id}"),
        None => url.to_string(),
    }
}

fn drive_file_id(url: &str) -> Option<&str> {
    RE_DRIVE_PATH_ID
        .captures(url)
        .or_else(|| RE_DRIVE_QUERY_ID.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| "data URI without payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err("only base64 data URIs are supported".to_string());
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

// ── Fetching ─────────────────────────────────────────────────────────────

/// Why a fetcher could not deliver bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status(u16),
    /// The fetcher's own timeout fired.
    Timeout,
    /// Connection, TLS or body-read failure.
    Transport(String),
}

/// Source of image bytes for remote references.
///
/// The production implementation is [`HttpImageFetcher`]; tests inject
/// in-memory fetchers so layout and degradation can be checked offline.
pub trait ImageFetcher: Send + Sync {
    /// Fetch the raw bytes at `url`. Only a success status yields `Ok`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// `reqwest`-backed fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("sheet2catalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;
        Ok(bytes.to_vec())
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Knobs the resolver needs from [`CatalogConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub timeout: Duration,
    pub max_pixels: u32,
}

impl From<&CatalogConfig> for ResolveOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_pixels: config.max_image_pixels,
        }
    }
}

/// A resolved image together with its report.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub image: ResolvedImage,
    pub outcome: ImageOutcome,
}

impl Resolution {
    fn no_image(row: usize) -> Self {
        Self {
            image: ResolvedImage::Placeholder,
            outcome: ImageOutcome {
                row,
                url: None,
                bytes: 0,
                status: ImageStatus::NoImage,
                error: None,
            },
        }
    }

    fn failed(row: usize, url: Option<String>, error: ImageError) -> Self {
        warn!("{}", error);
        Self {
            image: ResolvedImage::Placeholder,
            outcome: ImageOutcome {
                row,
                url,
                bytes: 0,
                status: ImageStatus::Failed,
                error: Some(error),
            },
        }
    }
}

/// Resolve one reference. Never fails; see the module docs.
///
/// `row` is 1-indexed and only used for reporting (0 for the cover logo).
pub async fn resolve<F: ImageFetcher>(
    fetcher: &F,
    row: usize,
    image_ref: &str,
    opts: &ResolveOptions,
) -> Resolution {
    match classify(image_ref) {
        ImageSource::Absent => Resolution::no_image(row),
        ImageSource::Unsupported(reference) => Resolution::failed(
            row,
            None,
            ImageError::UnsupportedReference { row, reference },
        ),
        ImageSource::Inline(uri) => match decode_data_uri(&uri) {
            Ok(bytes) => finish(row, None, bytes, opts).await,
            Err(detail) => Resolution::failed(row, None, ImageError::Decode { row, detail }),
        },
        ImageSource::Remote(url) => {
            debug!("Row {}: fetching {}", row, url);
            let secs = opts.timeout.as_secs();
            let fetched = tokio::time::timeout(opts.timeout, fetcher.fetch(&url)).await;
            let bytes = match fetched {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(FetchError::Status(status))) => {
                    let error = ImageError::HttpStatus {
                        row,
                        url: url.clone(),
                        status,
                    };
                    return Resolution::failed(row, Some(url), error);
                }
                Ok(Err(FetchError::Transport(detail))) => {
                    let error = ImageError::Transport {
                        row,
                        url: url.clone(),
                        detail,
                    };
                    return Resolution::failed(row, Some(url), error);
                }
                Ok(Err(FetchError::Timeout)) | Err(_) => {
                    let error = ImageError::Timeout {
                        row,
                        url: url.clone(),
                        secs,
                    };
                    return Resolution::failed(row, Some(url), error);
                }
            };
            finish(row, Some(url), bytes, opts).await
        }
    }
}

/// Decode fetched bytes off the async worker threads.
async fn finish(row: usize, url: Option<String>, bytes: Vec<u8>, opts: &ResolveOptions) -> Resolution {
    let size = bytes.len();
    let max_pixels = opts.max_pixels;
    let decoded = tokio::task::spawn_blocking(move || decode_image(&bytes, max_pixels))
        .await
        .map_err(|e| format!("decode task panicked: {e}"))
        .and_then(|r| r.map_err(|e| e.to_string()));

    match decoded {
        Ok(raster) => Resolution {
            image: ResolvedImage::Image(Arc::new(raster)),
            outcome: ImageOutcome {
                row,
                url,
                bytes: size,
                status: ImageStatus::Resolved,
                error: None,
            },
        },
        Err(detail) => Resolution::failed(row, url, ImageError::Decode { row, detail }),
    }
}

/// Resolve every record's image with at most `config.concurrency` fetches
/// in flight.
///
/// The returned vector is index-aligned with `records`: results are written
/// back into their slot, not appended in completion order.
pub async fn resolve_all<F: ImageFetcher>(
    fetcher: &F,
    records: &[ProductRecord],
    config: &CatalogConfig,
) -> Vec<Resolution> {
    let total = records.len();
    let opts = ResolveOptions::from(config);
    let callback = config.progress_callback.as_deref();

    let finished: Vec<(usize, Resolution)> =
        stream::iter(records.iter().enumerate().map(|(idx, record)| {
            let opts = &opts;
            async move {
                let row = idx + 1;
                let wants_fetch = !matches!(classify(&record.image_ref), ImageSource::Absent);
                if wants_fetch {
                    if let Some(cb) = callback {
                        cb.on_image_start(row, total);
                    }
                }
                let resolution = resolve(fetcher, row, &record.image_ref, opts).await;
                if let Some(cb) = callback {
                    report(cb, &resolution, total);
                }
                (idx, resolution)
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let mut slots: Vec<Option<Resolution>> = (0..total).map(|_| None).collect();
    for (idx, resolution) in finished {
        slots[idx] = Some(resolution);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.unwrap_or_else(|| Resolution::no_image(idx + 1)))
        .collect()
}

fn report(cb: &dyn CatalogProgressCallback, resolution: &Resolution, total: usize) {
    let o = &resolution.outcome;
    match (&o.status, &o.error) {
        (ImageStatus::Resolved, _) => cb.on_image_resolved(o.row, total, o.bytes),
        (ImageStatus::Failed, Some(e)) => cb.on_image_failed(o.row, total, &e.to_string()),
        _ => {}
    }
}
