//! # sheet2catalog
//!
//! Turn spreadsheet product rows into a paginated, categorised PDF catalog.
//!
//! Each row becomes a card with a picture, name, category, price and stock.
//! Cards are grouped by category (in the order categories first appear),
//! laid out two per row and three rows per page, and every page carries a
//! "Page N" footer. Rows with missing fields get sensible defaults, and
//! images that cannot be fetched are replaced by a grey placeholder so a
//! catalog is always produced.
//!
//! ## Pipeline Overview
//!
//! ```text
//! rows (JSON)
//!  │
//!  ├─ 1. Input      local file or URL → records
//!  ├─ 2. Normalise  field aliases, "N/A" / "Uncategorized" defaults
//!  ├─ 3. Images     Drive share-link rewrite, bounded-concurrency fetch,
//!  │                decode (spawn_blocking), placeholder on failure
//!  ├─ 4. Layout     cover + per-category grids as abstract blocks
//!  └─ 5. Render     page flow → printpdf, footer on every page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheet2catalog::{generate_to_file, load_records, CatalogConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let records = load_records("products.json", 120).await?;
//!     let config = CatalogConfig::builder().title("Spring Catalog").build()?;
//!     let stats = generate_to_file(&records, "catalog.pdf", &config).await?;
//!     eprintln!("{} products, {} pages of cards", stats.total_records, stats.grid_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sheet2catalog` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sheet2catalog = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CatalogConfig, CatalogConfigBuilder, LayoutOptions};
pub use error::{CatalogError, ImageError};
pub use generate::{
    generate, generate_from_input, generate_sync, generate_to_file, generate_with, write_pdf,
};
pub use output::{CatalogOutput, CatalogStats, ImageOutcome, ImageStatus};
pub use pipeline::image::{rewrite_share_link, HttpImageFetcher, ImageFetcher, ResolvedImage};
pub use pipeline::input::load_records;
pub use pipeline::layout::{Block, LayoutBuilder};
pub use progress::{CatalogProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{normalize, ProductRecord, Record};
pub use render::{DocumentRenderer, PageDecorator, PageNumberFooter, PdfRenderer};
