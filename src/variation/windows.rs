//! Lookback windows and their boundary dates.
//!
//! Boundaries are computed once per run from "today" and shared by every
//! instrument of that run.

use crate::time_series::DateRange;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    /// 7 business days before today
    SevenDays,
    /// 45 business days before today
    FortyFiveDays,
    /// 90 business days before today
    NinetyDays,
    /// Since January 1st of the current year
    YearToDate,
}

impl Window {
    /// The business-day lookbacks, shortest first.
    pub const SHORT: [Window; 3] = [Window::SevenDays, Window::FortyFiveDays, Window::NinetyDays];

    /// Number of business days looked back, or `None` for the calendar anchor.
    pub fn business_days(&self) -> Option<u32> {
        match self {
            Window::SevenDays => Some(7),
            Window::FortyFiveDays => Some(45),
            Window::NinetyDays => Some(90),
            Window::YearToDate => None,
        }
    }

    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Window::SevenDays => "7d",
            Window::FortyFiveDays => "45d",
            Window::NinetyDays => "90d",
            Window::YearToDate => "ytd",
        }
    }
}

/// Steps back `n` business days (Monday to Friday) from `date`.
///
/// Weekends are skipped; holidays are not modelled. From a Saturday or
/// Sunday the first step lands on the preceding Friday.
pub fn business_days_before(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = n;

    while remaining > 0 {
        current = match current.pred_opt() {
            Some(previous) => previous,
            None => break,
        };
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }

    current
}

/// January 1st of the year `date` falls in.
fn start_of_year(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.ordinal0()))
}

/// Boundary dates of every window for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBoundaries {
    today: NaiveDate,
    year_anchor: NaiveDate,
    seven_days: NaiveDate,
    forty_five_days: NaiveDate,
    ninety_days: NaiveDate,
}

impl WindowBoundaries {
    /// Computes the boundaries for `today`, anchoring year-to-date at
    /// January 1st of `today`'s year.
    pub fn for_today(today: NaiveDate) -> Self {
        Self::with_year_anchor(today, start_of_year(today))
    }

    /// Computes the boundaries with an explicit year-to-date anchor.
    pub fn with_year_anchor(today: NaiveDate, year_anchor: NaiveDate) -> Self {
        let lookback =
            |window: Window| business_days_before(today, window.business_days().unwrap_or(0));

        WindowBoundaries {
            today,
            year_anchor,
            seven_days: lookback(Window::SevenDays),
            forty_five_days: lookback(Window::FortyFiveDays),
            ninety_days: lookback(Window::NinetyDays),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn year_anchor(&self) -> NaiveDate {
        self.year_anchor
    }

    /// Reference date of a window.
    pub fn boundary(&self, window: Window) -> NaiveDate {
        match window {
            Window::SevenDays => self.seven_days,
            Window::FortyFiveDays => self.forty_five_days,
            Window::NinetyDays => self.ninety_days,
            Window::YearToDate => self.year_anchor,
        }
    }

    /// History needed for a run: January 1st of the year before the anchor's
    /// year through today. This always covers the 90 business day boundary.
    pub fn default_history_range(&self) -> DateRange {
        let previous_year_end = self
            .year_anchor
            .checked_sub_signed(Duration::days(1))
            .unwrap_or(self.year_anchor);
        let start = start_of_year(previous_year_end).min(self.ninety_days);
        DateRange::new(start, self.today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn business_days_skip_weekends() {
        // Monday -> previous Friday
        assert_eq!(business_days_before(date(2025, 3, 3), 1), date(2025, 2, 28));
        assert_eq!(business_days_before(date(2025, 3, 3), 7), date(2025, 2, 20));
        // Wednesday within the same week
        assert_eq!(business_days_before(date(2025, 3, 5), 2), date(2025, 3, 3));
    }

    #[test]
    fn business_days_from_weekend_start_at_friday() {
        assert_eq!(business_days_before(date(2025, 3, 1), 1), date(2025, 2, 28));
        assert_eq!(business_days_before(date(2025, 3, 2), 1), date(2025, 2, 28));
    }

    #[test]
    fn zero_business_days_is_identity() {
        assert_eq!(business_days_before(date(2025, 3, 1), 0), date(2025, 3, 1));
    }

    #[test]
    fn boundaries_for_today() {
        let boundaries = WindowBoundaries::for_today(date(2025, 3, 3));
        assert_eq!(boundaries.year_anchor(), date(2025, 1, 1));
        assert_eq!(boundaries.boundary(Window::SevenDays), date(2025, 2, 20));
        assert_eq!(boundaries.boundary(Window::YearToDate), date(2025, 1, 1));
        assert!(boundaries.boundary(Window::NinetyDays) < boundaries.boundary(Window::FortyFiveDays));
    }

    #[test]
    fn ninety_business_days_span_eighteen_weeks() {
        // 90 business days = 18 full weeks when starting on a weekday
        let today = date(2025, 6, 4);
        assert_eq!(
            business_days_before(today, 90),
            today - Duration::weeks(18)
        );
    }

    #[test]
    fn default_history_range_starts_previous_year() {
        let boundaries = WindowBoundaries::for_today(date(2025, 3, 3));
        let range = boundaries.default_history_range();
        assert_eq!(range.start, date(2024, 1, 1));
        assert_eq!(range.end, date(2025, 3, 3));
    }

    #[test]
    fn window_metadata() {
        assert_eq!(Window::NinetyDays.business_days(), Some(90));
        assert_eq!(Window::YearToDate.business_days(), None);
        assert_eq!(Window::FortyFiveDays.label(), "45d");
        assert_eq!(Window::YearToDate.label(), "ytd");
    }

    #[test]
    fn short_boundaries_follow_business_day_counts() {
        let today = date(2025, 1, 21);
        let boundaries = WindowBoundaries::for_today(today);
        for window in Window::SHORT {
            let days = window.business_days().unwrap();
            assert_eq!(boundaries.boundary(window), business_days_before(today, days));
        }
        assert_eq!(boundaries.boundary(Window::SevenDays), date(2025, 1, 10));
    }
}
