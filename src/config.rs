//! Runtime configuration for the report binary.

use crate::time_series::DateRange;
use crate::variation::WindowBoundaries;
use crate::yahoo_finance::DownloaderConfig;
use chrono::{Local, NaiveDate};
use std::fmt;
use std::path::PathBuf;

/// Slowest accepted request rate; zero disables rate limiting instead.
const MIN_REQUESTS_PER_SECOND: f64 = 1e-3;

/// Output format of the variation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Path to the SQLite history cache (default: "variation.db")
    pub database_path: PathBuf,
    /// Reference date; defaults to the local current date
    pub today: Option<NaiveDate>,
    /// First date of history to fetch; defaults to January 1st of the previous year
    pub history_start: Option<NaiveDate>,
    /// Output format (default: CSV)
    pub format: OutputFormat,
    /// Skip downloading and use the cache as is
    pub offline: bool,
    /// JSON catalog replacing the standard universe
    pub catalog_path: Option<PathBuf>,
    /// Price source client settings
    pub downloader: DownloaderConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            database_path: PathBuf::from("variation.db"),
            today: None,
            history_start: None,
            format: OutputFormat::Csv,
            offline: false,
            catalog_path: None,
            downloader: DownloaderConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Reads the configuration from `VARIATION_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ReportConfig::default();

        if let Some(path) = lookup("VARIATION_DB") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("VARIATION_TODAY") {
            config.today = Some(parse_date("VARIATION_TODAY", &value)?);
        }
        if let Some(value) = lookup("VARIATION_HISTORY_START") {
            config.history_start = Some(parse_date("VARIATION_HISTORY_START", &value)?);
        }
        if let Some(value) = lookup("VARIATION_FORMAT") {
            config.format = match value.to_ascii_lowercase().as_str() {
                "csv" => OutputFormat::Csv,
                "json" => OutputFormat::Json,
                _ => return Err(ConfigError::invalid("VARIATION_FORMAT", &value)),
            };
        }
        if let Some(value) = lookup("VARIATION_OFFLINE") {
            config.offline = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(path) = lookup("VARIATION_CATALOG") {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("VARIATION_CONCURRENCY") {
            config.downloader.concurrency = value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::invalid("VARIATION_CONCURRENCY", &value))?;
        }
        if let Some(value) = lookup("VARIATION_REQUESTS_PER_SECOND") {
            config.downloader.requests_per_second = value
                .parse::<f64>()
                .ok()
                .filter(|rps| rps.is_finite() && (*rps == 0.0 || *rps >= MIN_REQUESTS_PER_SECOND))
                .ok_or_else(|| ConfigError::invalid("VARIATION_REQUESTS_PER_SECOND", &value))?;
        }

        Ok(config)
    }

    /// The reference date of this run.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// History range to fetch for the given boundaries.
    pub fn history_range(&self, boundaries: &WindowBoundaries) -> Result<DateRange, ConfigError> {
        let default_range = boundaries.default_history_range();
        match self.history_start {
            Some(start) if start > default_range.end => Err(ConfigError::invalid(
                "VARIATION_HISTORY_START",
                &start.to_string(),
            )),
            Some(start) => Ok(DateRange::new(start, default_range.end)),
            None => Ok(default_range),
        }
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ConfigError::invalid(key, value))
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: String,
    pub value: String,
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        ConfigError {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value for {}: '{}'", self.key, self.value)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("variation.db"));
        assert_eq!(config.format, OutputFormat::Csv);
        assert!(!config.offline);
        assert!(config.today.is_none());
        assert_eq!(config.downloader.concurrency, 4);
    }

    #[test]
    fn test_overrides() {
        let config = ReportConfig::from_lookup(lookup_from(&[
            ("VARIATION_DB", "/tmp/history.db"),
            ("VARIATION_TODAY", "2025-03-03"),
            ("VARIATION_FORMAT", "JSON"),
            ("VARIATION_OFFLINE", "true"),
            ("VARIATION_CONCURRENCY", "8"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/history.db"));
        assert_eq!(config.today(), date(2025, 3, 3));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.offline);
        assert_eq!(config.downloader.concurrency, 8);
    }

    #[test]
    fn test_invalid_values() {
        let err = ReportConfig::from_lookup(lookup_from(&[("VARIATION_TODAY", "03/03/2025")]))
            .unwrap_err();
        assert_eq!(err.key, "VARIATION_TODAY");

        let err = ReportConfig::from_lookup(lookup_from(&[("VARIATION_FORMAT", "pdf")]))
            .unwrap_err();
        assert_eq!(err.key, "VARIATION_FORMAT");

        let err = ReportConfig::from_lookup(lookup_from(&[("VARIATION_CONCURRENCY", "0")]))
            .unwrap_err();
        assert_eq!(err.key, "VARIATION_CONCURRENCY");
    }

    #[test]
    fn test_requests_per_second_bounds() {
        for value in ["1e-300", "0.0001", "-1", "inf", "NaN"] {
            let err = ReportConfig::from_lookup(lookup_from(&[(
                "VARIATION_REQUESTS_PER_SECOND",
                value,
            )]))
            .unwrap_err();
            assert_eq!(err.key, "VARIATION_REQUESTS_PER_SECOND");
        }

        let config =
            ReportConfig::from_lookup(lookup_from(&[("VARIATION_REQUESTS_PER_SECOND", "0")]))
                .unwrap();
        assert_eq!(config.downloader.requests_per_second, 0.0);

        let config =
            ReportConfig::from_lookup(lookup_from(&[("VARIATION_REQUESTS_PER_SECOND", "0.001")]))
                .unwrap();
        assert_eq!(config.downloader.requests_per_second, 0.001);
    }

    #[test]
    fn test_history_range() {
        let boundaries = WindowBoundaries::for_today(date(2025, 3, 3));

        let config = ReportConfig::default();
        let range = config.history_range(&boundaries).unwrap();
        assert_eq!(range, DateRange::new(date(2024, 1, 1), date(2025, 3, 3)));

        let config = ReportConfig {
            history_start: Some(date(2023, 6, 1)),
            ..ReportConfig::default()
        };
        assert_eq!(config.history_range(&boundaries).unwrap().start, date(2023, 6, 1));

        let config = ReportConfig {
            history_start: Some(date(2025, 4, 1)),
            ..ReportConfig::default()
        };
        assert!(config.history_range(&boundaries).is_err());
    }
}
