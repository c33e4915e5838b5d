pub mod catalog;
pub mod config;
pub mod instrument;
pub mod sqlite_store;
pub mod time_series;
pub mod variation;
pub mod yahoo_finance;

pub use catalog::{CatalogError, InstrumentCatalog};
pub use config::{ConfigError, OutputFormat, ReportConfig};
pub use instrument::{Category, Instrument, InstrumentId, InstrumentIdError};
pub use sqlite_store::SqliteHistoryStore;
pub use time_series::{
    DateRange, HistorySource, HistorySourceError, InMemoryHistorySource, PriceObservation,
    RawObservation,
};
pub use variation::{
    build, build_with_range, compute, resolve_as_of, sanitize, RowOutcome, VariationError,
    VariationRow, VariationTable, Window, WindowBoundaries,
};
pub use yahoo_finance::{DownloadError, DownloadResult, DownloaderConfig, YahooFinanceDownloader};
