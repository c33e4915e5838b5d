//! Catalog-wide variation table.

use super::engine::{compute, RowOutcome, VariationError, VariationRow};
use super::windows::WindowBoundaries;
use crate::catalog::InstrumentCatalog;
use crate::instrument::Category;
use crate::time_series::{DateRange, HistorySource};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::io;
use tracing::{info, warn};

/// One row per catalog instrument, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationTable {
    today: NaiveDate,
    year_anchor: NaiveDate,
    rows: Vec<VariationRow>,
}

impl VariationTable {
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn year_anchor(&self) -> NaiveDate {
        self.year_anchor
    }

    pub fn rows(&self) -> &[VariationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by category (currency, index, commodity) and sorted by
    /// year-to-date variation ascending within each group.
    ///
    /// Rows without a year-to-date value come last; ties keep catalog order.
    /// Empty categories are omitted.
    pub fn by_category(&self) -> Vec<(Category, Vec<&VariationRow>)> {
        Category::ALL
            .iter()
            .filter_map(|category| {
                let mut rows: Vec<&VariationRow> = self
                    .rows
                    .iter()
                    .filter(|row| row.category() == *category)
                    .collect();
                if rows.is_empty() {
                    return None;
                }
                rows.sort_by_key(|row| {
                    let ytd = row.year_to_date();
                    (ytd.is_none(), ytd.map(OrderedFloat))
                });
                Some((*category, rows))
            })
            .collect()
    }

    /// Writes the table as CSV with a header row. Undefined values are empty cells.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Serializes the table as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds the variation table for `today` over the default history range.
///
/// Never fails and always yields one row per catalog instrument, in catalog
/// order.
pub fn build<S>(catalog: &InstrumentCatalog, source: &S, today: NaiveDate) -> VariationTable
where
    S: HistorySource + ?Sized,
{
    let boundaries = WindowBoundaries::for_today(today);
    let range = boundaries.default_history_range();
    build_with_range(catalog, source, &boundaries, &range)
}

/// Builds the variation table with explicit boundaries and history range.
///
/// A source error for one instrument is treated like an empty history: the
/// instrument gets an undefined row and the run continues.
pub fn build_with_range<S>(
    catalog: &InstrumentCatalog,
    source: &S,
    boundaries: &WindowBoundaries,
    range: &DateRange,
) -> VariationTable
where
    S: HistorySource + ?Sized,
{
    let mut rows = Vec::with_capacity(catalog.len());
    let mut degraded = 0;
    let mut without_data = 0;

    for instrument in catalog {
        let outcome = match source.fetch_history(instrument.id(), range) {
            Ok(history) if history.is_empty() => {
                without_data += 1;
                RowOutcome::Computed(VariationRow::undefined(instrument))
            }
            Ok(history) => compute(instrument, &history, boundaries),
            Err(err) => {
                warn!(
                    instrument = %instrument.id(),
                    name = instrument.name(),
                    error = %err,
                    "failed to fetch history, emitting undefined row"
                );
                RowOutcome::degraded(instrument, VariationError::from(err))
            }
        };

        if outcome.is_degraded() {
            degraded += 1;
        }
        rows.push(outcome.into_row());
    }

    info!(
        instruments = rows.len(),
        degraded,
        without_data,
        today = %boundaries.today(),
        "built variation table"
    );

    VariationTable {
        today: boundaries.today(),
        year_anchor: boundaries.year_anchor(),
        rows,
    }
}
