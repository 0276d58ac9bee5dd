//! Fixed review interval table.

use chrono::{Days, NaiveDate};

/// Highest mastery level.
pub const MAX_LEVEL: u8 = 3;

/// Days until the next review, indexed by level.
pub const REVIEW_INTERVALS: [u64; MAX_LEVEL as usize + 1] = [1, 2, 5, 10];

/// Returns the review offset in days for `level`; levels above
/// [`MAX_LEVEL`] use the top interval.
#[must_use]
pub const fn interval_days(level: u8) -> u64 {
    let index = if level > MAX_LEVEL { MAX_LEVEL } else { level };
    REVIEW_INTERVALS[index as usize]
}

/// Returns the calendar date a word at `level` is next due, counted from `today`.
///
/// ```
/// use chrono::NaiveDate;
/// use wordloop_engine::next_review_date;
///
/// let today = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
/// assert_eq!(next_review_date(2, today), NaiveDate::from_ymd_opt(2026, 2, 8).unwrap());
/// ```
#[must_use]
pub fn next_review_date(level: u8, today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(interval_days(level)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    #[test]
    fn test_next_review_date_per_level() {
        let expected = [
            NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        ];
        for (level, want) in (0..=MAX_LEVEL).zip(expected) {
            assert_eq!(next_review_date(level, today()), want, "level {level}");
        }
    }

    #[test]
    fn test_levels_above_max_clamp() {
        assert_eq!(interval_days(4), 10);
        assert_eq!(interval_days(u8::MAX), 10);
        assert_eq!(next_review_date(7, today()), next_review_date(3, today()));
    }

    #[test]
    fn test_crosses_month_boundary() {
        let jan_30 = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        assert_eq!(
            next_review_date(3, jan_30),
            NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
        );
    }
}
