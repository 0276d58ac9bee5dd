//! [`WordStore`] persisted as a single JSON document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{MemoryStore, WordStore};
use crate::error::{Result, WordloopError};
use crate::model::{Word, WordState};
use crate::summary::SessionRecord;

/// A [`WordStore`] that mirrors a [`MemoryStore`] to disk.
///
/// Every mutation is applied to a copy of the data, written to a temporary
/// file and renamed over the store file. If any step fails the in-memory data
/// is left as it was, so a batch is either fully stored or not at all.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    data: MemoryStore,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::Persistence` if the file exists but cannot be
    /// read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                WordloopError::persistence("open_store", format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file not found, starting empty");
                MemoryStore::new()
            }
            Err(e) => {
                return Err(WordloopError::persistence(
                    "open_store",
                    format!("{}: {e}", path.display()),
                ));
            }
        };

        Ok(Self { path, data })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only view of the current data.
    #[must_use]
    pub const fn data(&self) -> &MemoryStore {
        &self.data
    }

    /// Applies `change` to a copy of the data and persists it.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::Persistence` naming `operation` if the change
    /// itself fails or the file cannot be written.
    pub fn modify<T>(
        &mut self,
        operation: &str,
        change: impl FnOnce(&mut MemoryStore) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.data.clone();
        let value = change(&mut next)?;
        write_atomically(&self.path, &next).map_err(|e| {
            warn!(operation, path = %self.path.display(), error = %e, "Failed to write store");
            WordloopError::persistence(operation, e)
        })?;
        self.data = next;
        Ok(value)
    }
}

fn write_atomically(path: &Path, data: &MemoryStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl WordStore for JsonFileStore {
    fn due_word_states(
        &self,
        user_id: &str,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<WordState>> {
        self.data.due_word_states(user_id, today, limit)
    }

    fn count_due_word_states(&self, user_id: &str, today: NaiveDate) -> Result<usize> {
        self.data.count_due_word_states(user_id, today)
    }

    fn word_state_keys(&self, user_id: &str) -> Result<HashSet<String>> {
        self.data.word_state_keys(user_id)
    }

    fn word_state(&self, user_id: &str, word: &str) -> Result<Option<WordState>> {
        self.data.word_state(user_id, word)
    }

    fn word_states(&self, user_id: &str) -> Result<Vec<WordState>> {
        self.data.word_states(user_id)
    }

    fn catalog_words(&self, user_id: &str) -> Result<Vec<Word>> {
        self.data.catalog_words(user_id)
    }

    fn count_catalog_words(&self, user_id: &str) -> Result<usize> {
        self.data.count_catalog_words(user_id)
    }

    fn upsert_word_states(&mut self, user_id: &str, states: &[WordState]) -> Result<()> {
        self.modify("upsert_word_states", |data| {
            data.upsert_word_states(user_id, states)
        })
    }

    fn insert_word_state_if_absent(&mut self, user_id: &str, state: &WordState) -> Result<bool> {
        if self.data.word_state(user_id, &state.word)?.is_some() {
            return Ok(false);
        }
        self.modify("insert_word_state_if_absent", |data| {
            data.insert_word_state_if_absent(user_id, state)
        })
    }

    fn insert_session_record(&mut self, record: &SessionRecord) -> Result<()> {
        self.modify("insert_session_record", |data| {
            data.insert_session_record(record)
        })
    }

    fn session_record_for(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<SessionRecord>> {
        self.data.session_record_for(user_id, date)
    }

    fn ensure_word_states(&mut self, user_id: &str, states: &[WordState]) -> Result<usize> {
        let missing = states
            .iter()
            .filter(|state| !matches!(self.data.word_state(user_id, &state.word), Ok(Some(_))))
            .count();
        if missing == 0 {
            return Ok(0);
        }
        self.modify("ensure_word_states", |data| {
            data.ensure_word_states(user_id, states)
        })
    }
}
