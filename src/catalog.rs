//! The fixed universe of instruments the report covers.

use crate::instrument::{Category, Instrument, InstrumentId, InstrumentIdError};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

const CURRENCIES: &[(&str, &str)] = &[
    ("USDBRL=X", "Brazilian Real"),
    ("THB=X", "Thai Baht"),
    ("USDAUD=X", "Australian Dollar"),
    ("USDMXN=X", "Mexican Peso"),
    ("USDGBP=X", "Dollar vs Pound"),
    ("USDEUR=X", "Dollar vs Euro"),
    ("JPY=X", "Japanese Yen"),
    ("CHF=X", "Swiss Franc"),
    ("CAD=X", "Canadian Dollar"),
    ("CNY=X", "Chinese Yuan"),
    ("INR=X", "Indian Rupee"),
    ("CZK=X", "Czech Koruna"),
    ("TRY=X", "Turkish Lira"),
    ("NOK=X", "Norwegian Krone"),
    ("SEK=X", "Swedish Krona"),
];

const INDICES: &[(&str, &str)] = &[
    ("^GSPC", "S&P 500"),
    ("^DJI", "Dow Jones"),
    ("^IXIC", "Nasdaq"),
    ("^FTSE", "FTSE 100"),
    ("^N225", "Nikkei 225"),
    ("^GDAXI", "DAX"),
    ("^HSI", "Hang Seng"),
    ("^BSESN", "Sensex (India)"),
    ("^BVSP", "Bovespa"),
    ("^MERV", "Merval (Argentina)"),
    ("^FCHI", "CAC 40 (France)"),
    ("^BFX", "BEL 20 (Belgium)"),
    ("^TWII", "TSEC (Taiwan)"),
    ("^STOXX50E", "Euro Stoxx 50"),
    ("^TA125.TA", "TA-125 (Israel)"),
    ("000001.SS", "Shanghai Composite"),
];

const COMMODITIES: &[(&str, &str)] = &[
    ("CL=F", "WTI Crude Oil"),
    ("GC=F", "Gold"),
    ("SI=F", "Silver"),
    ("HG=F", "Copper"),
    ("NG=F", "Natural Gas"),
    ("ZC=F", "Corn"),
    ("ZW=F", "Wheat"),
    ("KC=F", "Coffee"),
    ("CT=F", "Cotton"),
    ("SB=F", "Sugar"),
    ("PA=F", "Palladium"),
    ("PL=F", "Platinum"),
    ("HO=F", "Heating Oil"),
    ("RB=F", "Gasoline"),
    ("OJ=F", "Orange Juice"),
    ("CC=F", "Cocoa"),
    ("ZS=F", "Soybeans"),
    ("ZM=F", "Soybean Meal"),
    ("LE=F", "Live Cattle"),
    ("HE=F", "Lean Hogs"),
    ("BZ=F", "Brent Crude Oil"),
    ("TIO=F", "Iron Ore"),
];

/// Ordered, immutable collection of instruments.
///
/// Iteration order is the order instruments were declared in, which is also
/// the row order of every variation table built from this catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
}

impl InstrumentCatalog {
    /// Builds a catalog from a list of instruments.
    ///
    /// # Errors
    /// Returns `CatalogError::DuplicateInstrument` if an identifier appears twice.
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for instrument in &instruments {
            if !seen.insert(instrument.id().clone()) {
                return Err(CatalogError::DuplicateInstrument(instrument.id().clone()));
            }
        }
        Ok(InstrumentCatalog { instruments })
    }

    /// The standard universe: currencies, then equity indices, then commodities.
    pub fn standard() -> Result<Self, CatalogError> {
        let tables = [
            (Category::Currency, CURRENCIES),
            (Category::Index, INDICES),
            (Category::Commodity, COMMODITIES),
        ];

        let mut instruments = Vec::new();
        for (category, entries) in tables {
            for (id, name) in entries {
                instruments.push(Instrument::new(*id, *name, category)?);
            }
        }

        Self::new(instruments)
    }

    /// Parses a catalog from a JSON array of `{"id", "name", "category"}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let instruments: Vec<Instrument> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(instruments)
    }

    /// Loads a catalog from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Iterates over instruments in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instrument> {
        self.instruments.iter()
    }

    /// Looks up an instrument by identifier.
    pub fn get(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.iter().find(|instrument| instrument.id() == id)
    }

    /// Instruments of one category, in catalog order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Instrument> {
        self.instruments
            .iter()
            .filter(move |instrument| instrument.category() == category)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl<'a> IntoIterator for &'a InstrumentCatalog {
    type Item = &'a Instrument;
    type IntoIter = std::slice::Iter<'a, Instrument>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Errors that can occur when building or loading a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The same identifier was declared twice
    DuplicateInstrument(InstrumentId),
    /// An identifier failed validation
    InvalidInstrument(InstrumentIdError),
    /// The catalog file could not be parsed
    Parse(String),
    /// The catalog file could not be read
    Io(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateInstrument(id) => write!(f, "Duplicate instrument: {}", id),
            CatalogError::InvalidInstrument(err) => write!(f, "Invalid instrument: {}", err),
            CatalogError::Parse(msg) => write!(f, "Catalog parse error: {}", msg),
            CatalogError::Io(msg) => write!(f, "Catalog read error: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<InstrumentIdError> for CatalogError {
    fn from(err: InstrumentIdError) -> Self {
        CatalogError::InvalidInstrument(err)
    }
}
