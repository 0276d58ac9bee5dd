//! Core data types shared by the queue builder, the session state machine
//! and the stores.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::interval::{next_review_date, MAX_LEVEL};

/// Returns the identity key of a word: its lowercase text.
#[must_use]
pub fn word_key(text: &str) -> String {
    text.trim().to_lowercase()
}

// ============================================================================
// Word
// ============================================================================

/// A catalog entry. Immutable content owned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Catalog id, unique within its source.
    pub id: u64,

    /// Display text of the word.
    pub word: String,

    /// Chinese meaning of this entry.
    pub meaning_cn: String,

    /// Phonetic transcription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,

    /// Example sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    /// Optional unit or grouping tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Stable id of the word list this entry belongs to.
    #[serde(default)]
    pub wordlist_id: String,
}

impl Word {
    /// Creates a word with only text and meaning.
    #[must_use]
    pub fn new(id: u64, word: impl Into<String>, meaning_cn: impl Into<String>) -> Self {
        Self {
            id,
            word: word.into(),
            meaning_cn: meaning_cn.into(),
            phonetic: None,
            example: None,
            unit: None,
            wordlist_id: String::new(),
        }
    }

    /// Returns the identity key of this word.
    #[must_use]
    pub fn key(&self) -> String {
        word_key(&self.word)
    }
}

// ============================================================================
// WordState
// ============================================================================

/// Per-user mastery state of one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordState {
    /// Lowercase word key.
    pub word: String,

    /// Mastery level, always within `0..=MAX_LEVEL`.
    pub level: u8,

    /// Calendar date on which the word is next due.
    pub next_review_at: NaiveDate,

    /// When the word was last studied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,

    /// Number of failed reviews; never decreases.
    #[serde(default)]
    pub wrong_count: u32,

    /// Consecutive successful reviews; reset on failure.
    #[serde(default)]
    pub correct_streak: u32,
}

impl WordState {
    /// State created on first exposure: level 0, due tomorrow.
    #[must_use]
    pub fn initial(word: &str, now: DateTime<Utc>) -> Self {
        Self {
            word: word_key(word),
            level: 0,
            next_review_at: next_review_date(0, now.date_naive()),
            last_seen_at: Some(now),
            wrong_count: 0,
            correct_streak: 0,
        }
    }

    /// Stand-in for a word that has no stored state yet.
    #[must_use]
    pub fn zero(word: &str, today: NaiveDate) -> Self {
        Self {
            word: word_key(word),
            level: 0,
            next_review_at: today,
            last_seen_at: None,
            wrong_count: 0,
            correct_streak: 0,
        }
    }

    /// Returns a copy with the level clamped to `0..=MAX_LEVEL`.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.level = self.level.min(MAX_LEVEL);
        self
    }

    /// Returns `true` if the word is due on or before `today`.
    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_at <= today
    }
}

// ============================================================================
// StudyWord / StudyItem
// ============================================================================

/// The two per-word sub-tasks within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Self-assessed recall of the meaning.
    Recall,
    /// Typing the word from its meaning.
    Spelling,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recall => write!(f, "recall"),
            Self::Spelling => write!(f, "spelling"),
        }
    }
}

/// Word content joined with the learner's state, as produced by the queue builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyWord {
    /// Canonical spelling.
    pub word: String,

    /// Every distinct meaning known for this word, in catalog order.
    pub meanings: Vec<String>,

    /// Phonetic transcription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,

    /// Example sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    /// Optional unit or grouping tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Stored state, absent for words never studied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<WordState>,
}

impl StudyWord {
    /// Builds a study word from a catalog entry with no state.
    #[must_use]
    pub fn from_word(word: &Word) -> Self {
        Self {
            word: word.word.clone(),
            meanings: vec![word.meaning_cn.clone()],
            phonetic: word.phonetic.clone(),
            example: word.example.clone(),
            unit: word.unit.clone(),
            state: None,
        }
    }

    /// Returns the identity key of this word.
    #[must_use]
    pub fn key(&self) -> String {
        word_key(&self.word)
    }

    /// Picks one meaning uniformly at random for a spelling prompt.
    pub fn pick_meaning<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if self.meanings.is_empty() {
            return self.word.clone();
        }
        let index = rng.gen_range(0..self.meanings.len());
        self.meanings[index].clone()
    }

    /// Returns `true` if `input` spells this word, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn is_spelled_by(&self, input: &str) -> bool {
        word_key(input) == self.key()
    }
}

/// A study word tagged with the step it is queued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyItem {
    /// The word being studied.
    pub word: StudyWord,

    /// Which step this queue entry asks for.
    pub step: Step,
}

impl StudyItem {
    /// Tags `word` with `step`.
    #[must_use]
    pub const fn new(word: StudyWord, step: Step) -> Self {
        Self { word, step }
    }
}
