//! Daily queue construction.
//!
//! A day's work is the due reviews (shuffled) followed by unseen catalog
//! words (catalog order). [`build_daily_queue`] is pure over its inputs;
//! [`load_daily_queue`] fetches those inputs from a [`WordStore`].

use std::collections::HashSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::model::{word_key, StudyWord, Word, WordState};
use crate::store::WordStore;

/// RNG used for every shuffle and meaning pick in a session.
pub type SessionRng = ChaCha8Rng;

/// Creates a session RNG, reproducible when `seed` is given.
#[must_use]
pub fn session_rng(seed: Option<u64>) -> SessionRng {
    seed.map_or_else(SessionRng::from_entropy, SessionRng::seed_from_u64)
}

// ============================================================================
// DailyQueue
// ============================================================================

/// Words selected for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQueue {
    /// Due reviews, shuffled, with their stored state.
    pub review_words: Vec<StudyWord>,

    /// Unseen catalog words in catalog order.
    pub new_words: Vec<StudyWord>,
}

impl DailyQueue {
    /// Returns `true` if there is nothing to study.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.review_words.is_empty() && self.new_words.is_empty()
    }
}

/// Builds the day's queue from already fetched inputs.
///
/// `due_states` are ordered by `next_review_at` and capped at
/// `settings.review_cap`; `catalog` is expected in catalog order. Catalog
/// entries sharing a key are merged so a study word carries every distinct
/// meaning.
pub fn build_daily_queue<R: Rng + ?Sized>(
    settings: &Settings,
    due_states: &[WordState],
    catalog: &[Word],
    studied_keys: &HashSet<String>,
    rng: &mut R,
) -> DailyQueue {
    let entries = merge_catalog(catalog);

    let mut due: Vec<&WordState> = due_states.iter().collect();
    due.sort_by_key(|state| state.next_review_at);
    due.truncate(settings.review_limit());

    let mut review_words: Vec<StudyWord> = due
        .into_iter()
        .map(|state| enrich(state, &entries))
        .collect();
    review_words.shuffle(rng);

    let new_words: Vec<StudyWord> = entries
        .iter()
        .filter(|(key, _)| !studied_keys.contains(*key))
        .take(settings.daily_new_limit())
        .map(|(_, word)| word.clone())
        .collect();

    DailyQueue {
        review_words,
        new_words,
    }
}

/// Fetches the inputs for `user_id` and builds the day's queue.
///
/// # Errors
///
/// Returns any error reported by the store.
pub fn load_daily_queue<S, R>(
    store: &S,
    user_id: &str,
    settings: &Settings,
    today: NaiveDate,
    rng: &mut R,
) -> Result<DailyQueue>
where
    S: WordStore + ?Sized,
    R: Rng + ?Sized,
{
    let due = store.due_word_states(user_id, today, settings.review_limit())?;
    let catalog = store.catalog_words(user_id)?;
    let studied = store.word_state_keys(user_id)?;

    let queue = build_daily_queue(settings, &due, &catalog, &studied, rng);
    debug!(
        user_id,
        reviews = queue.review_words.len(),
        new_words = queue.new_words.len(),
        "Built daily queue"
    );
    Ok(queue)
}

fn merge_catalog(catalog: &[Word]) -> IndexMap<String, StudyWord> {
    let mut entries: IndexMap<String, StudyWord> = IndexMap::new();
    for word in catalog {
        match entries.get_mut(&word.key()) {
            Some(existing) => {
                if !existing.meanings.contains(&word.meaning_cn) {
                    existing.meanings.push(word.meaning_cn.clone());
                }
            }
            None => {
                entries.insert(word.key(), StudyWord::from_word(word));
            }
        }
    }
    entries
}

fn enrich(state: &WordState, entries: &IndexMap<String, StudyWord>) -> StudyWord {
    let key = word_key(&state.word);
    let mut word = entries.get(&key).cloned().unwrap_or_else(|| StudyWord {
        word: key.clone(),
        meanings: vec![key.clone()],
        phonetic: None,
        example: None,
        unit: None,
        state: None,
    });
    word.state = Some(state.clone());
    word
}

// ============================================================================
// TaskCounts
// ============================================================================

/// Today's workload without word content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    /// Due reviews, capped at `review_cap`.
    pub review_count: usize,

    /// Available new words, capped at `daily_new`.
    pub new_count: usize,

    /// Words the user has a state for.
    pub total_studied: usize,

    /// Catalog entries visible to the user.
    pub total_words: usize,
}

/// Counts today's reviews and new words for `user_id`.
///
/// # Errors
///
/// Returns any error reported by the store.
pub fn count_tasks<S: WordStore + ?Sized>(
    store: &S,
    user_id: &str,
    settings: &Settings,
    today: NaiveDate,
) -> Result<TaskCounts> {
    let due = store.count_due_word_states(user_id, today)?;
    let total_studied = store.word_state_keys(user_id)?.len();
    let total_words = store.count_catalog_words(user_id)?;

    Ok(TaskCounts {
        review_count: due.min(settings.review_limit()),
        new_count: total_words
            .saturating_sub(total_studied)
            .min(settings.daily_new_limit()),
        total_studied,
        total_words,
    })
}
