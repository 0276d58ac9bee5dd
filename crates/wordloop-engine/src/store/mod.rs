//! Persistence collaborators consumed by the engine.
//!
//! The engine never owns storage. It reads due states and the catalog to build
//! a queue, and writes word states and session records through [`WordStore`].
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - in-process maps, used by tests and embedding apps
//! - [`JsonFileStore`] - one JSON document on disk, rewritten atomically

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{Word, WordState};
use crate::summary::SessionRecord;

/// Read/write contract for word states, the catalog and the session log.
///
/// All word-state operations are keyed by `(user_id, word key)`. Writes that
/// take a slice are applied as one batch: either every state is stored or the
/// call fails and none is.
pub trait WordStore: Send {
    /// States with `next_review_at <= today`, ascending by `next_review_at`,
    /// at most `limit` of them.
    fn due_word_states(
        &self,
        user_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WordState>>;

    /// Number of states due on or before `today`, uncapped.
    fn count_due_word_states(&self, user_id: &str, today: NaiveDate) -> Result<usize>;

    /// Keys of every word the user has a state for.
    fn word_state_keys(&self, user_id: &str) -> Result<HashSet<String>>;

    /// The stored state of one word.
    fn word_state(&self, user_id: &str, word: &str) -> Result<Option<WordState>>;

    /// All states of a user.
    fn word_states(&self, user_id: &str) -> Result<Vec<WordState>>;

    /// Built-in entries (by id) followed by the user's own entries (by id).
    fn catalog_words(&self, user_id: &str) -> Result<Vec<Word>>;

    /// Number of catalog entries visible to the user, duplicates included.
    fn count_catalog_words(&self, user_id: &str) -> Result<usize> {
        Ok(self.catalog_words(user_id)?.len())
    }

    /// Inserts or replaces the given states as one batch.
    fn upsert_word_states(&mut self, user_id: &str, states: &[WordState]) -> Result<()>;

    /// Inserts `state` unless the user already has a state for that word.
    ///
    /// Returns `true` if a row was inserted.
    fn insert_word_state_if_absent(&mut self, user_id: &str, state: &WordState) -> Result<bool>;

    /// Appends a session record to the log.
    fn insert_session_record(&mut self, record: &SessionRecord) -> Result<()>;

    /// The most recently inserted record of `date`, if any.
    fn session_record_for(&self, user_id: &str, date: NaiveDate)
        -> Result<Option<SessionRecord>>;

    /// Makes sure every word in `states` has a stored state.
    ///
    /// Existing rows are never modified, so calling this again with the same
    /// input is a no-op. Returns how many rows were created.
    fn ensure_word_states(&mut self, user_id: &str, states: &[WordState]) -> Result<usize> {
        let mut inserted = 0;
        for state in states {
            if self.insert_word_state_if_absent(user_id, state)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
