//! CLI binary for sheet2catalog.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CatalogConfig` and writes the PDF.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sheet2catalog::{
    generate, load_records, write_pdf, CatalogConfig, CatalogProgressCallback, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over image fetches. Rows without an image reference never
/// produce events, so the bar is cleared on completion rather than filled.
struct CliProgressCallback {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading records…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failed: AtomicUsize::new(0),
        })
    }
}

impl CatalogProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_rows: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_rows as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Fetching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building catalog of {total_rows} products…"))
        ));
    }

    fn on_image_start(&self, row: usize, _total: usize) {
        self.bar.set_message(format!("row {row}"));
    }

    fn on_image_resolved(&self, _row: usize, _total: usize, _bytes: usize) {
        self.bar.inc(1);
    }

    fn on_image_failed(&self, row: usize, total: usize, error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Row {:>3}/{:<3}  {}",
            red("✗"),
            row,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_rows: usize, resolved: usize) {
        self.bar.finish_and_clear();
        let failed = self.failed.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} products, {} with pictures",
                green("✔"),
                bold(&total_rows.to_string()),
                resolved
            );
        } else {
            eprintln!(
                "{} {} products, {} with pictures  ({} images unavailable)",
                cyan("⚠"),
                bold(&total_rows.to_string()),
                resolved,
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic catalog from a local export
  sheet2catalog products.json -o catalog.pdf

  # Records served over HTTP, custom title and currency
  sheet2catalog https://example.com/products.json --title "Spring 2024" --currency "€"

  # Cover logo from a Drive share link
  sheet2catalog products.json --logo "https://drive.google.com/file/d/FILE_ID/view"

  # Denser grid without category banners
  sheet2catalog products.json --cards-per-row 3 --card-size 4 --no-banner

  # Machine-readable report
  sheet2catalog products.json --json > report.json

INPUT FORMAT:
  A JSON array of objects, or an object with a "records" array. Recognised
  columns (lowercase or capitalised): nombre/name, categoria/category,
  precio/price, stock, imagen/image.
"#;

/// Render spreadsheet product rows into a categorised PDF catalog.
#[derive(Parser, Debug)]
#[command(
    name = "sheet2catalog",
    version,
    about = "Render spreadsheet product rows into a categorised PDF catalog",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local JSON file path or HTTP/HTTPS URL.
    input: String,

    /// Where to write the PDF.
    #[arg(short, long, env = "SHEET2CATALOG_OUTPUT", default_value = "catalog.pdf")]
    output: PathBuf,

    /// Cover title.
    #[arg(long, env = "SHEET2CATALOG_TITLE", default_value = "Product Catalog")]
    title: String,

    /// Cover logo: URL, Drive share link or data URI.
    #[arg(long, env = "SHEET2CATALOG_LOGO")]
    logo: Option<String>,

    /// Currency symbol printed before prices.
    #[arg(long, env = "SHEET2CATALOG_CURRENCY", default_value = "$")]
    currency: String,

    /// Cover date (YYYY-MM-DD or DD/MM/YYYY). Defaults to today.
    #[arg(long, env = "SHEET2CATALOG_DATE")]
    date: Option<String>,

    /// Edge of the square card image, in cm (2–8).
    #[arg(long, env = "SHEET2CATALOG_CARD_SIZE", default_value_t = 5.0)]
    card_size: f32,

    /// Cards per grid row (1–4).
    #[arg(long, env = "SHEET2CATALOG_CARDS_PER_ROW", default_value_t = 2)]
    cards_per_row: usize,

    /// Grid rows per page (1–6).
    #[arg(long, env = "SHEET2CATALOG_ROWS_PER_PAGE", default_value_t = 3)]
    rows_per_page: usize,

    /// Omit the cover logo.
    #[arg(long, env = "SHEET2CATALOG_NO_LOGO")]
    no_logo: bool,

    /// Omit the "Category: …" banner above each group.
    #[arg(long, env = "SHEET2CATALOG_NO_BANNER")]
    no_banner: bool,

    /// Number of concurrent image fetches.
    #[arg(short, long, env = "SHEET2CATALOG_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Per-image fetch timeout in seconds.
    #[arg(long, env = "SHEET2CATALOG_FETCH_TIMEOUT", default_value_t = 10)]
    fetch_timeout: u64,

    /// Record download timeout in seconds.
    #[arg(long, env = "SHEET2CATALOG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Longest image edge kept after decoding, in pixels.
    #[arg(long, env = "SHEET2CATALOG_MAX_IMAGE_PIXELS", default_value_t = 600)]
    max_image_pixels: u32,

    /// Print the generation report as JSON on stdout.
    #[arg(long, env = "SHEET2CATALOG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SHEET2CATALOG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHEET2CATALOG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SHEET2CATALOG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn CatalogProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run generation ───────────────────────────────────────────────────
    let records = load_records(&cli.input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to load records from '{}'", cli.input))?;

    let output = generate(&records, &config)
        .await
        .context("Catalog generation failed")?;

    write_pdf(&cli.output, &output.pdf)
        .await
        .context("Failed to write catalog")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} products  {} categories  {} grid pages  {}ms  →  {}",
            if stats.images_placeholder == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_records,
            stats.categories,
            stats.grid_pages,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if !show_progress {
            for err in output.image_errors() {
                eprintln!("   {}", dim(&err.to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `CatalogConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CatalogConfig> {
    let mut builder = CatalogConfig::builder()
        .title(cli.title.clone())
        .currency_symbol(cli.currency.clone())
        .card_size_cm(cli.card_size)
        .cards_per_row(cli.cards_per_row)
        .rows_per_page(cli.rows_per_page)
        .include_logo(!cli.no_logo)
        .include_category_banner(!cli.no_banner)
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_image_pixels(cli.max_image_pixels);

    if let Some(ref logo) = cli.logo {
        builder = builder.logo_ref(logo.clone());
    }
    if let Some(ref date) = cli.date {
        builder = builder.generated_on(parse_date(date)?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--date` as ISO or day-first.
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{s}': expected YYYY-MM-DD or DD/MM/YYYY"))
}
