//! Configuration types for catalog generation.
//!
//! All generation behaviour is controlled through [`CatalogConfig`], built
//! via its [`CatalogConfigBuilder`]. Layout knobs live in the nested
//! [`LayoutOptions`] so the layout builder can be exercised on its own
//! without a full config.

use crate::error::CatalogError;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cards per grid row.
pub const CARDS_PER_ROW: usize = 2;
/// Grid rows per catalog page.
pub const ROWS_PER_PAGE: usize = 3;
/// Edge of the square image box, in centimetres.
pub const CARD_SIZE_CM: f32 = 5.0;
/// Per-image fetch timeout.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Layout switches for the catalog grid.
///
/// The defaults are the catalog's fixed policy: a 2 × 3 grid of 5 cm cards
/// with a coloured banner per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Edge of the square image area on each card, in cm. Range: 2–8.
    pub card_size_cm: f32,
    /// Cards per grid row. Range: 1–4.
    pub cards_per_row: usize,
    /// Grid rows per page. Range: 1–6.
    pub rows_per_page: usize,
    /// Draw the logo on the cover when one was configured and resolved.
    pub include_logo: bool,
    /// Emit the coloured "Category: …" banner before each group.
    pub include_category_banner: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            card_size_cm: CARD_SIZE_CM,
            cards_per_row: CARDS_PER_ROW,
            rows_per_page: ROWS_PER_PAGE,
            include_logo: true,
            include_category_banner: true,
        }
    }
}

impl LayoutOptions {
    /// Cards that fit on one grid page.
    pub fn cards_per_page(&self) -> usize {
        self.cards_per_row * self.rows_per_page
    }
}

/// Configuration for one catalog generation.
///
/// Built via [`CatalogConfig::builder()`] or using
/// [`CatalogConfig::default()`].
///
/// # Example
/// ```rust
/// use sheet2catalog::CatalogConfig;
///
/// let config = CatalogConfig::builder()
///     .title("Spring Collection")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.cards_per_page(), 6);
/// ```
#[derive(Clone)]
pub struct CatalogConfig {
    /// Cover title. Default: "Product Catalog".
    pub title: String,

    /// Grid and banner options.
    pub layout: LayoutOptions,

    /// Image reference for the cover logo. Resolved like a product image.
    pub logo_ref: Option<String>,

    /// Prefix printed before each price. Default: "$".
    pub currency_symbol: String,

    /// Date printed on the cover. `None` means today (local time).
    pub generated_on: Option<NaiveDate>,

    /// Per-image fetch timeout in seconds. Default: 10.
    pub fetch_timeout_secs: u64,

    /// Download timeout for record-file URLs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Number of concurrent image fetches. Default: 8.
    ///
    /// `1` fetches images strictly one after another. Card order never
    /// depends on this value.
    pub concurrency: usize,

    /// Longest edge, in pixels, an image is downscaled to after decoding.
    /// Default: 600 (a 5 cm box at ~300 DPI).
    pub max_image_pixels: u32,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            title: "Product Catalog".to_string(),
            layout: LayoutOptions::default(),
            logo_ref: None,
            currency_symbol: "$".to_string(),
            generated_on: None,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            download_timeout_secs: 120,
            concurrency: 8,
            max_image_pixels: 600,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("title", &self.title)
            .field("layout", &self.layout)
            .field("logo_ref", &self.logo_ref)
            .field("currency_symbol", &self.currency_symbol)
            .field("generated_on", &self.generated_on)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("max_image_pixels", &self.max_image_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CatalogProgressCallback>"),
            )
            .finish()
    }
}

impl CatalogConfig {
    /// Create a new builder for `CatalogConfig`.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder {
            config: Self::default(),
        }
    }

    /// The cover date: the configured one, or today.
    pub fn cover_date(&self) -> NaiveDate {
        self.generated_on
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Debug)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn card_size_cm(mut self, cm: f32) -> Self {
        self.config.layout.card_size_cm = cm.clamp(2.0, 8.0);
        self
    }

    pub fn cards_per_row(mut self, n: usize) -> Self {
        self.config.layout.cards_per_row = n.clamp(1, 4);
        self
    }

    pub fn rows_per_page(mut self, n: usize) -> Self {
        self.config.layout.rows_per_page = n.clamp(1, 6);
        self
    }

    pub fn include_logo(mut self, v: bool) -> Self {
        self.config.layout.include_logo = v;
        self
    }

    pub fn include_category_banner(mut self, v: bool) -> Self {
        self.config.layout.include_category_banner = v;
        self
    }

    pub fn logo_ref(mut self, reference: impl Into<String>) -> Self {
        self.config.logo_ref = Some(reference.into());
        self
    }

    pub fn currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.config.currency_symbol = symbol.into();
        self
    }

    pub fn generated_on(mut self, date: NaiveDate) -> Self {
        self.config.generated_on = Some(date);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_image_pixels(mut self, px: u32) -> Self {
        self.config.max_image_pixels = px.max(16);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Setters already clamp; validation catches values assigned through
    /// [`Self::layout`] directly.
    pub fn build(self) -> Result<CatalogConfig, CatalogError> {
        let c = &self.config;
        let l = &c.layout;
        if !(2.0..=8.0).contains(&l.card_size_cm) {
            return Err(CatalogError::InvalidConfig(format!(
                "card size must be 2–8 cm, got {}",
                l.card_size_cm
            )));
        }
        if l.cards_per_row == 0 || l.cards_per_row > 4 {
            return Err(CatalogError::InvalidConfig(format!(
                "cards per row must be 1–4, got {}",
                l.cards_per_row
            )));
        }
        if l.rows_per_page == 0 || l.rows_per_page > 6 {
            return Err(CatalogError::InvalidConfig(format!(
                "rows per page must be 1–6, got {}",
                l.rows_per_page
            )));
        }
        if c.concurrency == 0 {
            return Err(CatalogError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.title.trim().is_empty() {
            return Err(CatalogError::InvalidConfig("title must not be empty".into()));
        }
        Ok(self.config)
    }
}
