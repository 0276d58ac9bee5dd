//! In-process [`WordStore`].

use std::collections::HashSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::WordStore;
use crate::error::Result;
use crate::model::{word_key, Word, WordState};
use crate::summary::SessionRecord;

/// A [`WordStore`] backed by ordered in-memory maps.
///
/// The whole store serializes to a single JSON document, which is what
/// [`super::JsonFileStore`] keeps on disk.
///
/// ```
/// use wordloop_engine::{MemoryStore, Word, WordStore};
///
/// let mut store = MemoryStore::new();
/// store.add_built_in_word(Word::new(1, "apple", "苹果"));
/// assert_eq!(store.catalog_words("local").unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Shared catalog entries.
    #[serde(default)]
    built_in_words: Vec<Word>,

    /// User-private catalog entries, keyed by user id.
    #[serde(default)]
    custom_words: IndexMap<String, Vec<Word>>,

    /// Word states keyed by user id, then word key.
    #[serde(default)]
    word_states: IndexMap<String, IndexMap<String, WordState>>,

    /// Append-only session log.
    #[serde(default)]
    sessions: Vec<SessionRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shared catalog entry.
    pub fn add_built_in_word(&mut self, word: Word) {
        self.built_in_words.push(word);
    }

    /// Adds a catalog entry visible only to `user_id`.
    pub fn add_custom_word(&mut self, user_id: &str, word: Word) {
        self.custom_words
            .entry(user_id.to_string())
            .or_default()
            .push(word);
    }

    /// Replaces a single state directly, bypassing batching.
    pub fn set_word_state(&mut self, user_id: &str, state: WordState) {
        self.word_states
            .entry(user_id.to_string())
            .or_default()
            .insert(word_key(&state.word), state.clamped());
    }

    /// Every stored session record, oldest first.
    #[must_use]
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    fn states_of(&self, user_id: &str) -> impl Iterator<Item = &WordState> {
        self.word_states
            .get(user_id)
            .into_iter()
            .flat_map(IndexMap::values)
    }
}

impl WordStore for MemoryStore {
    fn due_word_states(
        &self,
        user_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WordState>> {
        let mut due: Vec<WordState> = self
            .states_of(user_id)
            .filter(|state| state.is_due(today))
            .cloned()
            .collect();
        due.sort_by_key(|state| state.next_review_at);
        due.truncate(limit);
        Ok(due)
    }

    fn count_due_word_states(&self, user_id: &str, today: NaiveDate) -> Result<usize> {
        Ok(self
            .states_of(user_id)
            .filter(|state| state.is_due(today))
            .count())
    }

    fn word_state_keys(&self, user_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .word_states
            .get(user_id)
            .map(|states| states.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn word_state(&self, user_id: &str, word: &str) -> Result<Option<WordState>> {
        Ok(self
            .word_states
            .get(user_id)
            .and_then(|states| states.get(&word_key(word)))
            .cloned())
    }

    fn word_states(&self, user_id: &str) -> Result<Vec<WordState>> {
        Ok(self.states_of(user_id).cloned().collect())
    }

    fn catalog_words(&self, user_id: &str) -> Result<Vec<Word>> {
        let mut built_in = self.built_in_words.clone();
        built_in.sort_by_key(|word| word.id);

        let mut custom = self.custom_words.get(user_id).cloned().unwrap_or_default();
        custom.sort_by_key(|word| word.id);

        built_in.extend(custom);
        Ok(built_in)
    }

    fn count_catalog_words(&self, user_id: &str) -> Result<usize> {
        Ok(self.built_in_words.len() + self.custom_words.get(user_id).map_or(0, Vec::len))
    }

    fn upsert_word_states(&mut self, user_id: &str, states: &[WordState]) -> Result<()> {
        for state in states {
            self.set_word_state(user_id, state.clone());
        }
        Ok(())
    }

    fn insert_word_state_if_absent(&mut self, user_id: &str, state: &WordState) -> Result<bool> {
        let states = self.word_states.entry(user_id.to_string()).or_default();
        let key = word_key(&state.word);
        if states.contains_key(&key) {
            return Ok(false);
        }
        states.insert(key, state.clone().clamped());
        Ok(true)
    }

    fn insert_session_record(&mut self, record: &SessionRecord) -> Result<()> {
        self.sessions.push(record.clone());
        Ok(())
    }

    fn session_record_for(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SessionRecord>> {
        Ok(self
            .sessions
            .iter()
            .rev()
            .find(|record| record.user_id == user_id && record.date == date)
            .cloned())
    }
}
