//! Price variation engine
//!
//! Computes percentage price changes over fixed lookback windows (7, 45 and
//! 90 business days, and year-to-date) for every instrument of a catalog,
//! tolerating missing and irregular daily data.
//!
//! The pipeline per instrument is:
//! 1. [`sanitize`] the raw history (drop missing and zero closes),
//! 2. pick the reference prices: current price, year-start baseline, and the
//!    as-of price at each window boundary ([`resolve_as_of`]),
//! 3. derive the percent changes ([`compute`]).
//!
//! [`build`] runs this over a whole catalog and never fails: instruments
//! without data, or whose data is malformed, still get a row with undefined
//! values.

pub mod as_of;
pub mod engine;
pub mod sanitizer;
pub mod table;
pub mod windows;

pub use as_of::resolve_as_of;
pub use engine::{
    compute, percent_change, reference_prices, ReferencePrices, RowOutcome, VariationError,
    VariationRow,
};
pub use sanitizer::sanitize;
pub use table::{build, build_with_range, VariationTable};
pub use windows::{business_days_before, Window, WindowBoundaries};
