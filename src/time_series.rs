use crate::instrument::InstrumentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A daily close as delivered by a price source.
///
/// The close may be absent (no quote published for a listed day) or invalid;
/// see [`crate::variation::sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Trading day, with no time-of-day component
    pub date: NaiveDate,
    /// Close price, if one was published
    pub close: Option<f64>,
}

impl RawObservation {
    /// Creates an observation with a published close.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        RawObservation {
            date,
            close: Some(close),
        }
    }

    /// Creates an observation for a day without a published close.
    pub fn missing(date: NaiveDate) -> Self {
        RawObservation { date, close: None }
    }
}

/// A validated daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Trading day
    pub date: NaiveDate,
    /// Close price on that day
    pub close_price: f64,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, close_price: f64) -> Self {
        PriceObservation { date, close_price }
    }
}

/// Date range for querying price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Start date (inclusive)
    pub start: NaiveDate,
    /// End date (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new DateRange.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Returns true if `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Source of daily price history.
///
/// Implementations must return observations in ascending date order with no
/// duplicate dates, and must return an empty vector (not an error) when the
/// instrument simply has no data in the range. Errors are reserved for
/// failures of the source itself.
pub trait HistorySource {
    /// Retrieves the raw daily closes of `instrument` within `date_range`
    /// (inclusive on both ends).
    ///
    /// # Errors
    /// Returns an error if the date range is invalid or the source cannot be
    /// read.
    fn fetch_history(
        &self,
        instrument: &InstrumentId,
        date_range: &DateRange,
    ) -> Result<Vec<RawObservation>, HistorySourceError>;
}

/// Errors that can occur when querying a history source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySourceError {
    /// Invalid date range (e.g., start > end)
    InvalidDateRange,
    /// The source could not be reached or read
    Unavailable(String),
}

impl std::fmt::Display for HistorySourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistorySourceError::InvalidDateRange => write!(f, "Invalid date range"),
            HistorySourceError::Unavailable(msg) => write!(f, "History source unavailable: {}", msg),
        }
    }
}

impl std::error::Error for HistorySourceError {}

/// In-memory history source.
///
/// Useful in tests and wherever histories are already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistorySource {
    data: HashMap<InstrumentId, Vec<RawObservation>>,
}

impl InMemoryHistorySource {
    /// Creates a new empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the history of an instrument, replacing any previous one.
    ///
    /// Observations should be sorted by date.
    pub fn add_history(&mut self, instrument: InstrumentId, observations: Vec<RawObservation>) {
        self.data.insert(instrument, observations);
    }
}

impl HistorySource for InMemoryHistorySource {
    fn fetch_history(
        &self,
        instrument: &InstrumentId,
        date_range: &DateRange,
    ) -> Result<Vec<RawObservation>, HistorySourceError> {
        if date_range.start > date_range.end {
            return Err(HistorySourceError::InvalidDateRange);
        }

        let observations = match self.data.get(instrument) {
            Some(observations) => observations,
            None => return Ok(Vec::new()),
        };

        Ok(observations
            .iter()
            .filter(|observation| date_range.contains(observation.date))
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_in_memory_source_filters_range() {
        let mut source = InMemoryHistorySource::new();
        let id = InstrumentId::new("^GSPC").unwrap();
        source.add_history(
            id.clone(),
            vec![
                RawObservation::new(date(2024, 1, 14), 100.0),
                RawObservation::new(date(2024, 1, 15), 101.0),
                RawObservation::missing(date(2024, 1, 16)),
                RawObservation::new(date(2024, 1, 17), 103.0),
            ],
        );

        let range = DateRange::new(date(2024, 1, 15), date(2024, 1, 16));
        let result = source.fetch_history(&id, &range).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].close, Some(101.0));
        assert_eq!(result[1].close, None);
    }

    #[test]
    fn test_in_memory_source_unknown_instrument_is_empty() {
        let source = InMemoryHistorySource::new();
        let id = InstrumentId::new("GC=F").unwrap();
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert!(source.fetch_history(&id, &range).unwrap().is_empty());
    }

    #[test]
    fn test_in_memory_source_invalid_range() {
        let source = InMemoryHistorySource::new();
        let id = InstrumentId::new("GC=F").unwrap();
        let range = DateRange::new(date(2024, 1, 16), date(2024, 1, 15));
        assert_eq!(
            source.fetch_history(&id, &range).unwrap_err(),
            HistorySourceError::InvalidDateRange
        );
    }

    #[test]
    fn test_date_range_contains_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 15), date(2024, 1, 16));
        assert!(range.contains(date(2024, 1, 15)));
        assert!(range.contains(date(2024, 1, 16)));
        assert!(!range.contains(date(2024, 1, 17)));
    }
}
