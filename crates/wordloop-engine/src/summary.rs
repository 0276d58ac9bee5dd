//! Session aggregates and the persisted session record.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::interval::MAX_LEVEL;
use crate::model::WordState;

// ============================================================================
// SessionResults
// ============================================================================

/// Running counters of one study session.
///
/// Lives only as long as the session; [`SessionResults::summarize`] turns it
/// into a [`SessionRecord`] when the session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    /// When the session started.
    pub started_at: DateTime<Utc>,

    /// Number of new words in the daily queue.
    pub new_count: u32,

    /// Number of due reviews in the daily queue.
    pub review_count: u32,

    /// First spelling attempts that were correct.
    pub spelling_correct: u32,

    /// First spelling attempts made.
    pub spelling_total: u32,

    /// Recall steps answered "know".
    pub recall_know: u32,

    /// Recall steps answered "don't know".
    pub recall_dont_know: u32,

    /// Words whose level went up at a phase boundary.
    pub level_ups: u32,

    /// Missed first spelling attempts per word key, in first-miss order.
    pub word_errors: IndexMap<String, u32>,
}

impl SessionResults {
    /// Creates empty counters for a session starting at `started_at`.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, new_count: u32, review_count: u32) -> Self {
        Self {
            started_at,
            new_count,
            review_count,
            spelling_correct: 0,
            spelling_total: 0,
            recall_know: 0,
            recall_dont_know: 0,
            level_ups: 0,
            word_errors: IndexMap::new(),
        }
    }

    /// Counts one missed spelling for `word_key`.
    pub fn record_error(&mut self, word_key: &str) {
        *self.word_errors.entry(word_key.to_string()).or_insert(0) += 1;
    }

    /// Share of first spelling attempts that were correct.
    ///
    /// A session without spelling attempts counts as 1.0.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.spelling_total == 0 {
            1.0
        } else {
            f64::from(self.spelling_correct) / f64::from(self.spelling_total)
        }
    }

    /// Word with the most errors; ties go to the word that failed first.
    #[must_use]
    pub fn hardest_word(&self) -> Option<&str> {
        hardest_word(&self.word_errors)
    }

    /// Builds the record persisted when the session completes.
    #[must_use]
    pub fn summarize(&self, user_id: &str, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            user_id: user_id.to_string(),
            date: now.date_naive(),
            session_type: SessionType::All,
            new_count: self.new_count,
            review_count: self.review_count,
            spelling_accuracy: round2(self.accuracy()),
            self_eval_stats: SelfEvalStats {
                know: self.recall_know,
                dont_know: self.recall_dont_know,
            },
            duration_seconds: duration_seconds(self.started_at, now),
            hardest_word: self.hardest_word().unwrap_or_default().to_string(),
            level_ups: self.level_ups,
        }
    }
}

/// Returns the key with the highest count, preferring the earliest on ties.
///
/// ```
/// use indexmap::IndexMap;
/// use wordloop_engine::summary::hardest_word;
///
/// let errors: IndexMap<String, u32> =
///     [("cat", 2), ("dog", 3), ("rat", 1)].map(|(w, n)| (w.to_string(), n)).into_iter().collect();
/// assert_eq!(hardest_word(&errors), Some("dog"));
/// ```
#[must_use]
pub fn hardest_word(errors: &IndexMap<String, u32>) -> Option<&str> {
    let mut best: Option<(&str, u32)> = None;
    for (word, &count) in errors {
        if count > 0 && best.map_or(true, |(_, max)| count > max) {
            best = Some((word.as_str(), count));
        }
    }
    best.map(|(word, _)| word)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    let millis = (end - start).num_milliseconds().max(0);
    u64::try_from((millis + 500) / 1000).unwrap_or(0)
}

// ============================================================================
// SessionRecord
// ============================================================================

/// Kind of session recorded. Sessions always cover reviews and new words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Reviews, new words and relapse in one run.
    #[default]
    All,
}

/// Self-evaluation split of the recall steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEvalStats {
    /// Recall steps answered "know".
    pub know: u32,
    /// Recall steps answered "don't know".
    pub dont_know: u32,
}

/// Persisted summary of one completed session. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Learner the session belongs to.
    pub user_id: String,

    /// UTC date the session completed on.
    pub date: NaiveDate,

    /// Kind of session.
    #[serde(rename = "type", default)]
    pub session_type: SessionType,

    /// New words in the daily queue.
    pub new_count: u32,

    /// Due reviews in the daily queue.
    pub review_count: u32,

    /// First-attempt spelling accuracy in `0.0..=1.0`, two decimals.
    pub spelling_accuracy: f64,

    /// Recall self-evaluation split.
    pub self_eval_stats: SelfEvalStats,

    /// Wall time from start to completion.
    pub duration_seconds: u64,

    /// Word with the most spelling errors, empty if there were none.
    #[serde(default)]
    pub hardest_word: String,

    /// Words that moved up a level.
    pub level_ups: u32,
}

impl SessionRecord {
    /// Accuracy as a whole percentage.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        // Accuracy is clamped to 0..=1, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (self.spelling_accuracy.clamp(0.0, 1.0) * 100.0).round() as u32;
        percent
    }
}

// ============================================================================
// LevelDistribution
// ============================================================================

/// How many of a learner's words sit at each level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDistribution {
    /// Word counts for levels 0 through 3.
    pub levels: [u32; MAX_LEVEL as usize + 1],
}

impl LevelDistribution {
    /// Counts `states` by level; out-of-range levels count as the top level.
    #[must_use]
    pub fn from_states(states: &[WordState]) -> Self {
        let mut levels = [0; MAX_LEVEL as usize + 1];
        for state in states {
            levels[usize::from(state.level.min(MAX_LEVEL))] += 1;
        }
        Self { levels }
    }

    /// Words with any state.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.levels.iter().sum()
    }

    /// Words at the top level.
    #[must_use]
    pub const fn mastered(&self) -> u32 {
        self.levels[MAX_LEVEL as usize]
    }
}
