//! Variation Report Binary
//!
//! Refreshes the local price history cache and prints the variation table.
//!
//! Run with: `cargo run --bin variation-report`
//!
//! Configuration comes from environment variables:
//!   VARIATION_DB=variation.db       SQLite history cache
//!   VARIATION_TODAY=2025-03-03      reference date (default: today)
//!   VARIATION_HISTORY_START=...     first date to fetch
//!   VARIATION_FORMAT=csv|json       output format
//!   VARIATION_OFFLINE=1             skip downloading, use the cache
//!   VARIATION_CATALOG=path.json     replace the standard instrument universe
//!   VARIATION_CONCURRENCY=4         downloads in flight
//!   VARIATION_REQUESTS_PER_SECOND=2 download rate limit (0 disables it)
//!   RUST_LOG=debug                  log level (logs go to stderr)

use tracing_subscriber::EnvFilter;
use variation::{
    build_with_range, InstrumentCatalog, OutputFormat, ReportConfig, SqliteHistoryStore, Window,
    WindowBoundaries, YahooFinanceDownloader,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = ReportConfig::from_env()?;

    let catalog = match &config.catalog_path {
        Some(path) => InstrumentCatalog::from_json_file(path)?,
        None => InstrumentCatalog::standard()?,
    };

    let boundaries = WindowBoundaries::for_today(config.today());
    let range = config.history_range(&boundaries)?;

    tracing::info!(
        today = %boundaries.today(),
        year_anchor = %boundaries.year_anchor(),
        history_start = %range.start,
        instruments = catalog.len(),
        database = %config.database_path.display(),
        "starting variation report"
    );

    for window in Window::SHORT {
        tracing::debug!(
            window = window.label(),
            boundary = %boundaries.boundary(window),
            "window boundary"
        );
    }

    let mut store = SqliteHistoryStore::new(&config.database_path)?;

    if config.offline {
        tracing::info!("offline mode, using cached history");
        for instrument in &catalog {
            match store.latest_date(instrument.id())? {
                Some(latest) if latest < boundaries.today() => tracing::info!(
                    instrument = %instrument.id(),
                    latest = %latest,
                    "cached history ends before today"
                ),
                Some(_) => {}
                None => tracing::warn!(instrument = %instrument.id(), "no cached history"),
            }
        }
    } else {
        let downloader = YahooFinanceDownloader::with_config(config.downloader.clone())?;
        let result = downloader
            .download_catalog_to_sqlite(&mut store, &catalog, &range)
            .await;
        for (id, error) in &result.failed {
            tracing::warn!(instrument = %id, error = %error, "using cached history only");
        }
    }

    let table = build_with_range(&catalog, &store, &boundaries, &range);

    match config.format {
        OutputFormat::Csv => table.write_csv(std::io::stdout().lock())?,
        OutputFormat::Json => println!("{}", table.to_json()?),
    }

    Ok(())
}
