use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a tracked instrument, as understood by the price source.
///
/// Identifiers follow the quote-vendor symbology, so besides alphanumerics
/// they may contain `.`, `-`, `_`, `^` (indices) and `=` (currency pairs and
/// continuous futures), e.g. `USDBRL=X`, `^GSPC`, `CL=F`, `000001.SS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Creates a new identifier.
    ///
    /// # Errors
    /// Returns an error if the identifier is empty or contains characters
    /// outside the accepted symbology.
    pub fn new(id: impl Into<String>) -> Result<Self, InstrumentIdError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(InstrumentId(id))
    }

    fn validate(id: &str) -> Result<(), InstrumentIdError> {
        if id.is_empty() {
            return Err(InstrumentIdError::Empty);
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='))
        {
            return Err(InstrumentIdError::InvalidCharacters(id.to_string()));
        }

        Ok(())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for InstrumentId {
    type Error = InstrumentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InstrumentId::new(value)
    }
}

impl From<InstrumentId> for String {
    fn from(id: InstrumentId) -> Self {
        id.0
    }
}

/// Errors that can occur when creating an instrument identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentIdError {
    /// The identifier is empty
    Empty,
    /// The identifier contains characters outside the accepted symbology
    InvalidCharacters(String),
}

impl fmt::Display for InstrumentIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentIdError::Empty => write!(f, "Instrument id cannot be empty"),
            InstrumentIdError::InvalidCharacters(id) => {
                write!(f, "Instrument id '{}' contains invalid characters", id)
            }
        }
    }
}

impl std::error::Error for InstrumentIdError {}

/// Classification used to group instruments for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Exchange rate against the US dollar
    Currency,
    /// Equity market index
    Index,
    /// Commodity future
    Commodity,
}

impl Category {
    /// All categories in reporting order.
    pub const ALL: [Category; 3] = [Category::Currency, Category::Index, Category::Commodity];

    /// Returns a string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Currency => "Currency",
            Category::Index => "Index",
            Category::Commodity => "Commodity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked instrument. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    id: InstrumentId,
    name: String,
    category: Category,
}

impl Instrument {
    /// Creates a new instrument.
    ///
    /// # Errors
    /// Returns an error if `id` is not a valid identifier.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
    ) -> Result<Self, InstrumentIdError> {
        Ok(Instrument {
            id: InstrumentId::new(id)?,
            name: name.into(),
            category,
        })
    }

    /// Returns the identifier.
    pub fn id(&self) -> &InstrumentId {
        &self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the category.
    pub fn category(&self) -> Category {
        self.category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_id_accepts_vendor_symbols() {
        for symbol in ["USDBRL=X", "^GSPC", "CL=F", "000001.SS", "^TA125.TA"] {
            assert!(InstrumentId::new(symbol).is_ok(), "{} should be valid", symbol);
        }
    }

    #[test]
    fn test_instrument_id_empty() {
        assert_eq!(InstrumentId::new("").unwrap_err(), InstrumentIdError::Empty);
    }

    #[test]
    fn test_instrument_id_invalid_characters() {
        let result = InstrumentId::new("CL F");
        assert_eq!(
            result.unwrap_err(),
            InstrumentIdError::InvalidCharacters("CL F".to_string())
        );
    }

    #[test]
    fn test_instrument_id_display() {
        let id = InstrumentId::new("^BVSP").unwrap();
        assert_eq!(format!("{}", id), "^BVSP");
        assert_eq!(id.as_str(), "^BVSP");
    }

    #[test]
    fn test_instrument_id_deserialize_validates() {
        let ok: InstrumentId = serde_json::from_str("\"GC=F\"").unwrap();
        assert_eq!(ok.as_str(), "GC=F");

        let err = serde_json::from_str::<InstrumentId>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::Currency.as_str(), "Currency");
        assert_eq!(Category::Index.to_string(), "Index");
        assert_eq!(
            serde_json::to_string(&Category::Commodity).unwrap(),
            "\"commodity\""
        );
    }

    #[test]
    fn test_instrument_accessors() {
        let instrument = Instrument::new("GC=F", "Gold", Category::Commodity).unwrap();
        assert_eq!(instrument.id().as_str(), "GC=F");
        assert_eq!(instrument.name(), "Gold");
        assert_eq!(instrument.category(), Category::Commodity);
    }
}
