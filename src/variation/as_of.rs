use crate::time_series::PriceObservation;
use chrono::NaiveDate;

/// Returns the close observed on `date`, or the latest close before it.
///
/// `series` must be sorted by ascending date with unique dates. Returns
/// `None` when no observation exists on or before `date`.
pub fn resolve_as_of(series: &[PriceObservation], date: NaiveDate) -> Option<f64> {
    let after_last_eligible = series.partition_point(|observation| observation.date <= date);
    after_last_eligible
        .checked_sub(1)
        .map(|index| series[index].close_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series() -> Vec<PriceObservation> {
        vec![
            PriceObservation::new(date(2025, 1, 1), 100.0),
            PriceObservation::new(date(2025, 1, 3), 105.0),
        ]
    }

    #[test]
    fn falls_back_to_prior_observation() {
        assert_eq!(resolve_as_of(&series(), date(2025, 1, 2)), Some(100.0));
    }

    #[test]
    fn exact_match_wins() {
        assert_eq!(resolve_as_of(&series(), date(2025, 1, 3)), Some(105.0));
        assert_eq!(resolve_as_of(&series(), date(2025, 1, 1)), Some(100.0));
    }

    #[test]
    fn nothing_prior_is_undefined() {
        assert_eq!(resolve_as_of(&series(), date(2024, 12, 31)), None);
        assert_eq!(resolve_as_of(&[], date(2025, 1, 3)), None);
    }

    #[test]
    fn after_last_observation_uses_last() {
        assert_eq!(resolve_as_of(&series(), date(2025, 6, 30)), Some(105.0));
    }
}
