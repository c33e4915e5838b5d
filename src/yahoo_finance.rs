use crate::catalog::InstrumentCatalog;
use crate::instrument::InstrumentId;
use crate::sqlite_store::SqliteHistoryStore;
use crate::time_series::{DateRange, RawObservation};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime};
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// Longest pause enforced between two requests.
const MAX_REQUEST_INTERVAL: Duration = Duration::from_secs(600);

/// Configuration for Yahoo Finance downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Rate limit: requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum number of requests in flight (default: 4)
    pub concurrency: usize,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        DownloaderConfig {
            max_retries: 3,
            requests_per_second: 2.0,
            timeout_seconds: 30,
            concurrency: 4,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) variation-report/0.1".to_string(),
        }
    }
}

/// Yahoo Finance daily history downloader
///
/// Fetches daily closes from the chart endpoint, normalizes exchange-local
/// timestamps to calendar dates and optionally stores them in SQLite.
#[derive(Debug)]
pub struct YahooFinanceDownloader {
    client: Client,
    config: DownloaderConfig,
    next_slot: Mutex<Instant>,
}

impl YahooFinanceDownloader {
    /// Creates a new Yahoo Finance downloader with default configuration.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(DownloaderConfig::default())
    }

    /// Creates a new Yahoo Finance downloader with custom configuration.
    ///
    /// # Returns
    /// Returns `Ok(YahooFinanceDownloader)` if successful, or an error if HTTP client creation fails.
    pub fn with_config(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DownloadError::ClientCreation(e.to_string()))?;

        Ok(YahooFinanceDownloader {
            client,
            config,
            next_slot: Mutex::new(Instant::now()),
        })
    }

    /// Builds the chart URL for a symbol and date range.
    ///
    /// The range end is inclusive, so the request runs up to midnight after it.
    pub fn chart_url(&self, symbol: &str, date_range: &DateRange) -> Result<Url, DownloadError> {
        let period1 = unix_midnight(date_range.start);
        let period2 = date_range
            .end
            .checked_add_signed(ChronoDuration::days(1))
            .map(unix_midnight)
            .ok_or_else(|| DownloadError::InvalidDate(date_range.end.to_string()))?;

        let mut url = Url::parse(CHART_URL).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DownloadError::InvalidUrl(CHART_URL.to_string()))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        Ok(url)
    }

    /// Pause between request slots; zero when rate limiting is disabled.
    fn request_interval(&self) -> Duration {
        if self.config.requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.config.requests_per_second)
                .map_or(MAX_REQUEST_INTERVAL, |interval| interval.min(MAX_REQUEST_INTERVAL))
        } else {
            Duration::ZERO
        }
    }

    /// Waits for the next request slot allowed by the rate limit.
    async fn throttle(&self) {
        let wait_until = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot.checked_add(self.request_interval()).unwrap_or(slot);
            slot
        };
        tokio::time::sleep_until(wait_until).await;
    }

    async fn request(&self, url: &Url) -> Result<String, DownloadError> {
        self.throttle().await;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let status = response.status();
        // Unknown symbols come back as 404 with a chart error payload
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let message = format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                DownloadError::Unavailable(message)
            } else {
                DownloadError::ApiError(message)
            });
        }

        response
            .text()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))
    }

    /// Fetches the daily history of `symbol`, retrying transient failures.
    ///
    /// Returns an empty vector when the source has no data for the symbol.
    ///
    /// # Errors
    /// Returns `DownloadError` if the request keeps failing or the payload cannot be parsed.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        date_range: &DateRange,
    ) -> Result<Vec<RawObservation>, DownloadError> {
        let url = self.chart_url(symbol, date_range)?;
        let mut attempt = 0;

        loop {
            match self.request(&url).await {
                Ok(body) => return parse_chart_response(&body),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    log::warn!(
                        "Fetching {} failed ({}), retry {}/{} in {:?}",
                        symbol,
                        err,
                        attempt,
                        self.config.max_retries,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetches every catalog instrument with bounded concurrency.
    ///
    /// Results are returned in catalog order regardless of completion order.
    pub async fn fetch_catalog(
        &self,
        catalog: &InstrumentCatalog,
        date_range: &DateRange,
    ) -> Vec<(InstrumentId, Result<Vec<RawObservation>, DownloadError>)> {
        stream::iter(catalog.iter())
            .map(|instrument| async move {
                let result = self.fetch_history(instrument.id().as_str(), date_range).await;
                (instrument.id().clone(), result)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Downloads every catalog instrument into the store.
    ///
    /// Failures are collected per instrument and never abort the download.
    pub async fn download_catalog_to_sqlite(
        &self,
        store: &mut SqliteHistoryStore,
        catalog: &InstrumentCatalog,
        date_range: &DateRange,
    ) -> DownloadResult {
        log::info!(
            "Downloading {} instruments, {} to {}",
            catalog.len(),
            date_range.start,
            date_range.end
        );

        let mut result = DownloadResult::default();
        let fetched = self.fetch_catalog(catalog, date_range).await;

        for (instrument, (id, fetch_result)) in catalog.iter().zip(fetched) {
            let stored = fetch_result.and_then(|observations| {
                store
                    .store_instrument(instrument)
                    .and_then(|_| store.insert_observations(&id, &observations))
                    .map_err(|e| DownloadError::Storage(e.to_string()))
            });

            match stored {
                Ok(count) => result.successful.push((id, count)),
                Err(err) => {
                    log::warn!("Download of {} ({}) failed: {}", instrument.name(), id, err);
                    result.failed.push((id, err));
                }
            }
        }

        log::info!(
            "Download complete: {} succeeded, {} failed",
            result.successful.len(),
            result.failed.len()
        );
        result
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Outcome of a catalog download, in catalog order.
#[derive(Debug, Default)]
pub struct DownloadResult {
    /// Instruments stored, with the number of observations written
    pub successful: Vec<(InstrumentId, usize)>,
    /// Instruments that could not be fetched or stored
    pub failed: Vec<(InstrumentId, DownloadError)>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Parses a chart payload into daily observations.
///
/// Timestamps are shifted to exchange-local time before taking the calendar
/// date, so a bar never lands on the neighbouring day. The result is sorted
/// with one observation per date; when a date repeats, the later observation
/// wins unless it lacks a close.
pub fn parse_chart_response(body: &str) -> Result<Vec<RawObservation>, DownloadError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| DownloadError::ParseError(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return if error.code == "Not Found" {
            Ok(Vec::new())
        } else {
            Err(DownloadError::ApiError(format!("{}: {}", error.code, error.description)))
        };
    }

    let result = match response.chart.result.and_then(|results| results.into_iter().next()) {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    let mut observations = Vec::with_capacity(result.timestamp.len());
    for (index, timestamp) in result.timestamp.iter().enumerate() {
        let local = timestamp
            .checked_add(result.meta.gmtoffset)
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .ok_or_else(|| DownloadError::ParseError(format!("Invalid timestamp: {}", timestamp)))?;
        observations.push(RawObservation {
            date: local.date_naive(),
            close: closes.get(index).copied().flatten(),
        });
    }

    observations.sort_by_key(|observation| observation.date);

    let mut deduplicated: Vec<RawObservation> = Vec::with_capacity(observations.len());
    for observation in observations {
        match deduplicated.last_mut() {
            Some(last) if last.date == observation.date => {
                if observation.close.is_some() || last.close.is_none() {
                    *last = observation;
                }
            }
            _ => deduplicated.push(observation),
        }
    }

    Ok(deduplicated)
}

/// Errors that can occur during Yahoo Finance data downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// HTTP client creation failed
    ClientCreation(String),
    /// Request URL could not be built
    InvalidUrl(String),
    /// Network error occurred
    NetworkError(String),
    /// Rate limited or server-side failure; worth retrying
    Unavailable(String),
    /// API returned an error response
    ApiError(String),
    /// Failed to parse response data
    ParseError(String),
    /// Invalid date provided
    InvalidDate(String),
    /// Fetched data could not be stored
    Storage(String),
}

impl DownloadError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DownloadError::NetworkError(_) | DownloadError::Unavailable(_))
    }
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::ClientCreation(msg) => write!(f, "Client creation error: {}", msg),
            DownloadError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            DownloadError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DownloadError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
            DownloadError::ApiError(msg) => write!(f, "API error: {}", msg),
            DownloadError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DownloadError::InvalidDate(msg) => write!(f, "Invalid date: {}", msg),
            DownloadError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}
