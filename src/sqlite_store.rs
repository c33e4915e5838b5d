use crate::instrument::{Instrument, InstrumentId};
use crate::time_series::{DateRange, HistorySource, HistorySourceError, RawObservation};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::Path;

/// SQLite-backed history cache.
///
/// Stores the raw daily closes downloaded from the price source, including
/// days without a published close, so runs can be repeated offline.
/// Automatically creates schema on first use.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Opens (or creates) a file-based store.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = SqliteHistoryStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates a store backed by an in-memory database.
    pub fn new_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteHistoryStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> SqliteResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS instruments (
                instrument_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL
            )",
            [],
        )?;

        // close_price is NULL for days listed without a close
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS price_history (
                instrument_id TEXT NOT NULL,
                date TEXT NOT NULL,
                close_price REAL,
                PRIMARY KEY (instrument_id, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_price_history_instrument ON price_history(instrument_id)",
            [],
        )?;

        Ok(())
    }

    /// Records (or updates) an instrument's metadata.
    pub fn store_instrument(&self, instrument: &Instrument) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO instruments (instrument_id, name, category) VALUES (?1, ?2, ?3)",
            params![
                instrument.id().as_str(),
                instrument.name(),
                instrument.category().as_str()
            ],
        )?;
        Ok(())
    }

    /// Inserts observations in one transaction, replacing existing rows for
    /// the same dates. Returns the number of rows written.
    pub fn insert_observations(
        &mut self,
        instrument: &InstrumentId,
        observations: &[RawObservation],
    ) -> SqliteResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO price_history (instrument_id, date, close_price)
                 VALUES (?1, ?2, ?3)",
            )?;
            for observation in observations {
                stmt.execute(params![
                    instrument.as_str(),
                    observation.date,
                    observation.close
                ])?;
            }
        }
        tx.commit()?;
        Ok(observations.len())
    }

    /// Latest date stored for an instrument, if any.
    pub fn latest_date(&self, instrument: &InstrumentId) -> SqliteResult<Option<NaiveDate>> {
        self.conn.query_row(
            "SELECT MAX(date) FROM price_history WHERE instrument_id = ?1",
            [instrument.as_str()],
            |row| row.get(0),
        )
    }
}

impl HistorySource for SqliteHistoryStore {
    fn fetch_history(
        &self,
        instrument: &InstrumentId,
        date_range: &DateRange,
    ) -> Result<Vec<RawObservation>, HistorySourceError> {
        if date_range.start > date_range.end {
            return Err(HistorySourceError::InvalidDateRange);
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, close_price FROM price_history
                 WHERE instrument_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date",
            )
            .map_err(|e| HistorySourceError::Unavailable(format!("SQL error: {}", e)))?;

        let rows = stmt
            .query_map(
                params![instrument.as_str(), date_range.start, date_range.end],
                |row| {
                    Ok(RawObservation {
                        date: row.get(0)?,
                        close: row.get(1)?,
                    })
                },
            )
            .map_err(|e| HistorySourceError::Unavailable(format!("SQL error: {}", e)))?;

        let observations = rows
            .collect::<SqliteResult<Vec<_>>>()
            .map_err(|e| HistorySourceError::Unavailable(format!("Row parsing error: {}", e)))?;

        Ok(observations)
    }
}
