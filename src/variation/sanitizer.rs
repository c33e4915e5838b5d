//! Removal of unusable closes from a raw history.

use crate::time_series::{PriceObservation, RawObservation};

/// Drops observations whose close is missing (absent or NaN) or exactly zero.
///
/// Relative order of the remaining observations is preserved. A history with
/// no usable close sanitizes to an empty vector.
pub fn sanitize(raw: &[RawObservation]) -> Vec<PriceObservation> {
    raw.iter()
        .filter_map(|observation| match observation.close {
            Some(close) if !close.is_nan() && close != 0.0 => {
                Some(PriceObservation::new(observation.date, close))
            }
            _ => None,
        })
        .collect()
}
