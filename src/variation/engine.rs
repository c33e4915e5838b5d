//! Per-instrument variation computation.

use super::as_of::resolve_as_of;
use super::sanitizer::sanitize;
use super::windows::{Window, WindowBoundaries};
use crate::instrument::{Category, Instrument, InstrumentId};
use crate::time_series::{HistorySourceError, PriceObservation, RawObservation};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Percent change from `reference` to `current`.
///
/// Returns `None` when the reference is zero or the result is not finite.
pub fn percent_change(current: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    let change = (current - reference) / reference * 100.0;
    change.is_finite().then_some(change)
}

/// Variations of one instrument. Values are percentages; `None` means
/// undefined (no data, or a zero reference price).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationRow {
    instrument: InstrumentId,
    name: String,
    category: Category,
    year_to_date: Option<f64>,
    seven_days: Option<f64>,
    forty_five_days: Option<f64>,
    ninety_days: Option<f64>,
}

impl VariationRow {
    /// A row with every variation undefined.
    pub fn undefined(instrument: &Instrument) -> Self {
        VariationRow {
            instrument: instrument.id().clone(),
            name: instrument.name().to_string(),
            category: instrument.category(),
            year_to_date: None,
            seven_days: None,
            forty_five_days: None,
            ninety_days: None,
        }
    }

    fn from_prices(instrument: &Instrument, prices: &ReferencePrices) -> Self {
        let short = |window: Window| {
            prices
                .as_of(window)
                .and_then(|reference| percent_change(prices.current, reference))
        };

        VariationRow {
            year_to_date: prices
                .year_start
                .and_then(|baseline| percent_change(prices.current, baseline)),
            seven_days: short(Window::SevenDays),
            forty_five_days: short(Window::FortyFiveDays),
            ninety_days: short(Window::NinetyDays),
            ..Self::undefined(instrument)
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Variation of one window.
    pub fn variation(&self, window: Window) -> Option<f64> {
        match window {
            Window::SevenDays => self.seven_days,
            Window::FortyFiveDays => self.forty_five_days,
            Window::NinetyDays => self.ninety_days,
            Window::YearToDate => self.year_to_date,
        }
    }

    pub fn year_to_date(&self) -> Option<f64> {
        self.year_to_date
    }

    pub fn is_undefined(&self) -> bool {
        self.year_to_date.is_none()
            && self.seven_days.is_none()
            && self.forty_five_days.is_none()
            && self.ninety_days.is_none()
    }
}

/// Prices a row is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePrices {
    /// Latest close of the current year, or of the whole history when the
    /// current year has no data
    pub current: f64,
    /// First close on or after the year anchor
    pub year_start: Option<f64>,
    /// As-of closes at the 7, 45 and 90 business day boundaries
    pub short_windows: [Option<f64>; 3],
}

impl ReferencePrices {
    /// As-of close of a short window; `None` for year-to-date.
    pub fn as_of(&self, window: Window) -> Option<f64> {
        Window::SHORT
            .iter()
            .position(|candidate| *candidate == window)
            .and_then(|index| self.short_windows[index])
    }
}

/// Selects the reference prices from a sanitized, date-ordered series.
///
/// Returns `None` for an empty series.
pub fn reference_prices(
    series: &[PriceObservation],
    boundaries: &WindowBoundaries,
) -> Option<ReferencePrices> {
    let last = series.last()?;

    let year_start_index =
        series.partition_point(|observation| observation.date < boundaries.year_anchor());
    let current_year = &series[year_start_index..];

    // An empty current year still yields short-window variations against the
    // latest close available.
    let (current, year_start) = match (current_year.first(), current_year.last()) {
        (Some(first), Some(latest)) => (latest.close_price, Some(first.close_price)),
        _ => (last.close_price, None),
    };

    let short_windows =
        Window::SHORT.map(|window| resolve_as_of(series, boundaries.boundary(window)));

    Some(ReferencePrices {
        current,
        year_start,
        short_windows,
    })
}

/// Reasons a history cannot be turned into variations.
#[derive(Debug, Clone, PartialEq)]
pub enum VariationError {
    /// Dates go backwards
    UnorderedDates { previous: NaiveDate, next: NaiveDate },
    /// The same trading day appears twice
    DuplicateDate(NaiveDate),
    /// A close is infinite
    NonFinitePrice(NaiveDate),
    /// The history could not be fetched
    Source(HistorySourceError),
}

impl fmt::Display for VariationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariationError::UnorderedDates { previous, next } => {
                write!(f, "History out of order: {} follows {}", next, previous)
            }
            VariationError::DuplicateDate(date) => write!(f, "Duplicate observation on {}", date),
            VariationError::NonFinitePrice(date) => write!(f, "Non-finite close on {}", date),
            VariationError::Source(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for VariationError {}

impl From<HistorySourceError> for VariationError {
    fn from(err: HistorySourceError) -> Self {
        VariationError::Source(err)
    }
}

fn validate(series: &[PriceObservation]) -> Result<(), VariationError> {
    for observation in series {
        if !observation.close_price.is_finite() {
            return Err(VariationError::NonFinitePrice(observation.date));
        }
    }

    for pair in series.windows(2) {
        let (previous, next) = (pair[0].date, pair[1].date);
        if next == previous {
            return Err(VariationError::DuplicateDate(next));
        }
        if next < previous {
            return Err(VariationError::UnorderedDates { previous, next });
        }
    }

    Ok(())
}

/// Outcome of computing one instrument.
///
/// Both variants carry a row, so a failure never removes an instrument from
/// the table.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Variations computed from the history
    Computed(VariationRow),
    /// Computation failed; the row is fully undefined
    Degraded {
        row: VariationRow,
        reason: VariationError,
    },
}

impl RowOutcome {
    /// Converts a failure into an undefined row for `instrument`.
    pub fn degraded(instrument: &Instrument, reason: VariationError) -> Self {
        RowOutcome::Degraded {
            row: VariationRow::undefined(instrument),
            reason,
        }
    }

    pub fn row(&self) -> &VariationRow {
        match self {
            RowOutcome::Computed(row) => row,
            RowOutcome::Degraded { row, .. } => row,
        }
    }

    pub fn into_row(self) -> VariationRow {
        match self {
            RowOutcome::Computed(row) => row,
            RowOutcome::Degraded { row, .. } => row,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RowOutcome::Degraded { .. })
    }
}

fn try_compute(
    instrument: &Instrument,
    history: &[RawObservation],
    boundaries: &WindowBoundaries,
) -> Result<VariationRow, VariationError> {
    let series = sanitize(history);
    validate(&series)?;

    Ok(match reference_prices(&series, boundaries) {
        Some(prices) => VariationRow::from_prices(instrument, &prices),
        None => VariationRow::undefined(instrument),
    })
}

/// Computes the variations of one instrument from its raw history.
///
/// Never fails: malformed histories produce [`RowOutcome::Degraded`] with an
/// all-undefined row, and the failure is logged.
pub fn compute(
    instrument: &Instrument,
    history: &[RawObservation],
    boundaries: &WindowBoundaries,
) -> RowOutcome {
    match try_compute(instrument, history, boundaries) {
        Ok(row) => {
            debug!(
                instrument = %instrument.id(),
                observations = history.len(),
                year_to_date = ?row.year_to_date,
                seven_days = ?row.seven_days,
                "computed variations"
            );
            RowOutcome::Computed(row)
        }
        Err(reason) => {
            warn!(
                instrument = %instrument.id(),
                name = instrument.name(),
                reason = %reason,
                "failed to compute variations, emitting undefined row"
            );
            RowOutcome::degraded(instrument, reason)
        }
    }
}
