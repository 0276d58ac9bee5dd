//! Mastery level updates applied at phase completion.

use chrono::{DateTime, Utc};

use crate::interval::{next_review_date, MAX_LEVEL};
use crate::model::WordState;

/// Applies one review outcome to `current`.
///
/// A word moves up one level only when both the recall self-assessment and
/// the first spelling attempt passed; any failure drops it one level, resets
/// the streak and counts a wrong answer. The next review date follows the
/// new level and `last_seen_at` becomes `now`.
///
/// ```
/// use chrono::Utc;
/// use wordloop_engine::{update_level, WordState};
///
/// let now = Utc::now();
/// let state = WordState::initial("apple", now);
/// let updated = update_level(&state, true, true, now);
/// assert_eq!(updated.level, 1);
/// assert_eq!(updated.correct_streak, 1);
/// ```
#[must_use]
pub fn update_level(
    current: &WordState,
    recall_passed: bool,
    spelling_passed: bool,
    now: DateTime<Utc>,
) -> WordState {
    let level = current.level.min(MAX_LEVEL);

    let (level, correct_streak, wrong_count) = if recall_passed && spelling_passed {
        (
            (level + 1).min(MAX_LEVEL),
            current.correct_streak.saturating_add(1),
            current.wrong_count,
        )
    } else {
        (
            level.saturating_sub(1),
            0,
            current.wrong_count.saturating_add(1),
        )
    };

    WordState {
        word: current.word.clone(),
        level,
        next_review_at: next_review_date(level, now.date_naive()),
        last_seen_at: Some(now),
        wrong_count,
        correct_streak,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-03T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn state(level: u8, wrong_count: u32, correct_streak: u32) -> WordState {
        WordState {
            word: "cat".to_string(),
            level,
            next_review_at: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            last_seen_at: None,
            wrong_count,
            correct_streak,
        }
    }

    #[test]
    fn test_both_passed_levels_up() {
        for level in 0..=MAX_LEVEL {
            let updated = update_level(&state(level, 4, 2), true, true, now());
            assert_eq!(updated.level, (level + 1).min(MAX_LEVEL));
            assert_eq!(updated.correct_streak, 3);
            assert_eq!(updated.wrong_count, 4);
            assert_eq!(
                updated.next_review_at,
                next_review_date(updated.level, now().date_naive())
            );
        }
    }

    #[test]
    fn test_any_failure_levels_down() {
        for level in 0..=MAX_LEVEL {
            for (recall, spelling) in [(false, true), (true, false), (false, false)] {
                let updated = update_level(&state(level, 4, 2), recall, spelling, now());
                assert_eq!(updated.level, level.saturating_sub(1));
                assert_eq!(updated.correct_streak, 0);
                assert_eq!(updated.wrong_count, 5);
            }
        }
    }

    #[test]
    fn test_max_level_stays_at_max() {
        let updated = update_level(&state(3, 0, 9), true, true, now());
        assert_eq!(updated.level, 3);
        assert_eq!(
            updated.next_review_at,
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap()
        );
    }

    #[test]
    fn test_level_zero_failure_stays_at_zero() {
        let updated = update_level(&state(0, 0, 0), false, true, now());
        assert_eq!(updated.level, 0);
        assert_eq!(
            updated.next_review_at,
            NaiveDate::from_ymd_opt(2026, 2, 4).unwrap()
        );
    }

    #[test]
    fn test_out_of_range_level_is_clamped_first() {
        let updated = update_level(&state(9, 0, 0), false, false, now());
        assert_eq!(updated.level, 2);
    }

    #[test]
    fn test_last_seen_set_to_now() {
        let updated = update_level(&state(1, 0, 0), true, false, now());
        assert_eq!(updated.last_seen_at, Some(now()));
        assert_eq!(updated.word, "cat");
    }
}
