//! The study-session state machine.
//!
//! A session walks through up to four phases, each a queue of
//! [`StudyItem`]s:
//!
//! ```text
//! Review ──► NewLearn ──► NewReview ──► Relapse ──► Complete
//!    │           │             │            ▲
//!    └───────────┴─────────────┴────────────┘ (skipped when empty)
//! ```
//!
//! Every word passes a recall step (self-assessment) and a spelling step.
//! Level updates happen once per phase, as one batch written through the
//! [`WordStore`]. `NewLearn` only creates initial states.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{Result, WordloopError};
use crate::level::update_level;
use crate::model::{Step, StudyItem, StudyWord, WordState};
use crate::queue::{load_daily_queue, DailyQueue, SessionRng};
use crate::store::WordStore;
use crate::summary::{SessionRecord, SessionResults};

// ============================================================================
// Phase
// ============================================================================

/// Session phases, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Due reviews.
    Review,
    /// First exposure to new words, recall and spelling interleaved per word.
    NewLearn,
    /// Immediate review of the words just learned.
    NewReview,
    /// Replay of words failed earlier in the session.
    Relapse,
    /// Terminal state; the session record has been produced.
    Complete,
}

impl Phase {
    /// Returns `true` for the terminal phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Review => "review",
            Self::NewLearn => "new_learn",
            Self::NewReview => "new_review",
            Self::Relapse => "relapse",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Result of one spelling submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SpellingOutcome {
    /// First attempt matched; the step is resolved.
    Correct,
    /// First attempt missed; the learner must now type the correct spelling.
    Incorrect {
        /// The spelling to copy.
        correct_spelling: String,
    },
    /// A correction attempt matched; the step is resolved.
    Corrected,
    /// A correction attempt missed again.
    StillIncorrect,
}

/// Position within the planned work of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Items planned so far, relapse items included once scheduled.
    pub total_items: usize,
    /// Items finished.
    pub completed_items: usize,
    /// `completed_items / total_items` as a rounded percentage.
    pub percent: u32,
}

#[derive(Debug, Clone)]
struct SpellingState {
    display_meaning: String,
    attempted: bool,
    needs_correction: bool,
    resolved: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct WordOutcome {
    recall: Option<bool>,
    spelling: Option<bool>,
}

// ============================================================================
// StudySession
// ============================================================================

/// One learner's pass through the day's queue.
///
/// The session is driven by four actions: [`reveal`](Self::reveal),
/// [`submit_recall`](Self::submit_recall),
/// [`submit_spelling`](Self::submit_spelling) and
/// [`proceed`](Self::proceed). Actions that can finish a phase take the store
/// so the phase's level updates can be written. A failed write is reported
/// as `WordloopError::Persistence` but the session still moves on.
///
/// Dropping the session (or calling [`abandon`](Self::abandon)) discards all
/// progress that has not been written yet.
///
/// ```
/// use std::sync::Arc;
/// use wordloop_engine::{
///     session_rng, MemoryStore, Phase, Settings, StudySession, SystemClock, Word,
/// };
///
/// let mut store = MemoryStore::new();
/// store.add_built_in_word(Word::new(1, "apple", "苹果"));
///
/// let mut session = StudySession::start(
///     &store,
///     "local",
///     Settings::default(),
///     Arc::new(SystemClock),
///     session_rng(Some(7)),
/// )
/// .unwrap();
/// assert_eq!(session.phase(), Phase::NewLearn);
///
/// session.reveal().unwrap();
/// session.submit_recall(&mut store, true).unwrap();
/// session.submit_spelling("apple").unwrap();
/// session.proceed(&mut store).unwrap();
/// assert_eq!(session.phase(), Phase::NewReview);
/// ```
#[derive(Debug)]
pub struct StudySession {
    user_id: String,
    settings: Settings,
    clock: Arc<dyn Clock>,
    rng: SessionRng,

    review_words: Vec<StudyWord>,
    new_words: Vec<StudyWord>,
    relapse: IndexMap<String, StudyWord>,

    phase: Phase,
    queue: VecDeque<StudyItem>,
    current: Option<StudyItem>,
    answer_shown: bool,
    spelling: Option<SpellingState>,
    outcomes: IndexMap<String, WordOutcome>,

    total_items: usize,
    completed_items: usize,
    results: SessionResults,
    record: Option<SessionRecord>,
    record_persisted: bool,
}

impl StudySession {
    /// Builds today's queue for `user_id` and starts a session.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::EmptyQueue` if there is nothing to study, or
    /// any error the store reports while the queue is built.
    pub fn start<S: WordStore + ?Sized>(
        store: &S,
        user_id: impl Into<String>,
        settings: Settings,
        clock: Arc<dyn Clock>,
        mut rng: SessionRng,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let queue = load_daily_queue(store, &user_id, &settings, clock.today(), &mut rng)?;
        Self::from_queue(queue, user_id, settings, clock, rng)
    }

    /// Starts a session from an already built queue.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::EmptyQueue` if the queue holds no words.
    pub fn from_queue(
        queue: DailyQueue,
        user_id: impl Into<String>,
        settings: Settings,
        clock: Arc<dyn Clock>,
        rng: SessionRng,
    ) -> Result<Self> {
        let user_id = user_id.into();
        if queue.is_empty() {
            info!(user_id = %user_id, "Nothing to study today");
            return Err(WordloopError::EmptyQueue);
        }
        let first = if queue.review_words.is_empty() {
            Phase::NewLearn
        } else {
            Phase::Review
        };

        let review_count = queue.review_words.len();
        let new_count = queue.new_words.len();
        let results = SessionResults::new(clock.now(), count(new_count), count(review_count));

        let mut session = Self {
            user_id,
            settings,
            clock,
            rng,
            review_words: queue.review_words,
            new_words: queue.new_words,
            relapse: IndexMap::new(),
            phase: first,
            queue: VecDeque::new(),
            current: None,
            answer_shown: false,
            spelling: None,
            outcomes: IndexMap::new(),
            total_items: 2 * review_count + 4 * new_count,
            completed_items: 0,
            results,
            record: None,
            record_persisted: false,
        };

        info!(
            user_id = %session.user_id,
            reviews = review_count,
            new_words = new_count,
            phase = %first,
            "Study session started"
        );
        session.enter_phase(first);
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Learner this session belongs to.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` once the session record has been produced.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// The item being worked on, `None` once complete.
    #[must_use]
    pub const fn current(&self) -> Option<&StudyItem> {
        self.current.as_ref()
    }

    /// Step of the current item.
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        self.current.as_ref().map(|item| item.step)
    }

    /// Whether the answer of the current recall item was revealed.
    #[must_use]
    pub const fn answer_shown(&self) -> bool {
        self.answer_shown
    }

    /// Meaning shown as the prompt of the current spelling item.
    #[must_use]
    pub fn display_meaning(&self) -> Option<&str> {
        self.spelling.as_ref().map(|s| s.display_meaning.as_str())
    }

    /// Whether the current spelling item is waiting for a correction.
    #[must_use]
    pub fn needs_correction(&self) -> bool {
        self.spelling.as_ref().is_some_and(|s| s.needs_correction)
    }

    /// Whether the current spelling item can be left with [`proceed`](Self::proceed).
    #[must_use]
    pub fn spelling_resolved(&self) -> bool {
        self.spelling.as_ref().is_some_and(|s| s.resolved)
    }

    /// Words failed so far, in first-failure order.
    pub fn relapse_words(&self) -> impl Iterator<Item = &StudyWord> {
        self.relapse.values()
    }

    /// Running counters.
    #[must_use]
    pub const fn results(&self) -> &SessionResults {
        &self.results
    }

    /// The session record, available once complete.
    #[must_use]
    pub const fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// Whether the session record reached the store.
    ///
    /// `false` before completion and after a failed insert. A caller holding
    /// [`Self::record`] may retry the insert itself.
    #[must_use]
    pub const fn record_persisted(&self) -> bool {
        self.record_persisted
    }

    /// Items finished out of items planned.
    #[must_use]
    pub fn progress(&self) -> Progress {
        let completed = self.completed_items.min(self.total_items);
        let percent = if self.total_items == 0 {
            100
        } else {
            u32::try_from((completed * 100 + self.total_items / 2) / self.total_items)
                .unwrap_or(100)
        };
        Progress {
            total_items: self.total_items,
            completed_items: completed,
            percent,
        }
    }

    /// A serializable view of the session for front ends.
    ///
    /// The word text is withheld while an unresolved spelling item waits for
    /// its first attempt.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            phase: self.phase,
            step: self.step(),
            word: None,
            meaning: None,
            phonetic: None,
            example: None,
            answer_shown: self.answer_shown,
            needs_correction: self.needs_correction(),
            spelling_resolved: self.spelling_resolved(),
            progress: self.progress(),
            record: self.record.clone(),
        };

        let Some(item) = &self.current else {
            return snapshot;
        };
        let show_word = match item.step {
            Step::Recall => true,
            Step::Spelling => self
                .spelling
                .as_ref()
                .is_some_and(|s| s.attempted || s.resolved),
        };
        if show_word {
            snapshot.word = Some(item.word.word.clone());
            snapshot.phonetic.clone_from(&item.word.phonetic);
            snapshot.example.clone_from(&item.word.example);
        }
        snapshot.meaning = match item.step {
            Step::Recall if self.answer_shown => Some(item.word.meanings.join("; ")),
            Step::Recall => None,
            Step::Spelling => self.display_meaning().map(str::to_string),
        };
        snapshot
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Shows the answer of the current recall item. Not scored.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::InvalidAction` unless the current item is a
    /// recall step.
    pub fn reveal(&mut self) -> Result<()> {
        let word = self.expect_step(Step::Recall, "reveal")?.word.word.clone();
        self.answer_shown = true;
        debug!(word = %word, "Answer revealed");
        Ok(())
    }

    /// Records the learner's self-assessment and moves to the next item.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::InvalidAction` unless the current item is a
    /// recall step, or `WordloopError::Persistence` if this finished a phase
    /// and its writes failed.
    pub fn submit_recall<S: WordStore + ?Sized>(&mut self, store: &mut S, know: bool) -> Result<()> {
        let word = self.expect_step(Step::Recall, "submit_recall")?.word.clone();

        if know {
            self.results.recall_know += 1;
        } else {
            self.results.recall_dont_know += 1;
            self.add_relapse(&word);
        }
        self.outcomes.entry(word.key()).or_default().recall = Some(know);
        debug!(word = %word.word, know, phase = %self.phase, "Recall submitted");

        self.finish_item(store)
    }

    /// Checks a spelling attempt for the current item.
    ///
    /// Only the first attempt is scored. A miss puts the word into the
    /// relapse set and switches the step into correction mode, which ends
    /// once the correct spelling is typed.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::MalformedInput` for empty input and
    /// `WordloopError::InvalidAction` unless an unresolved spelling step is
    /// current. Neither changes the session.
    pub fn submit_spelling(&mut self, input: &str) -> Result<SpellingOutcome> {
        let word = self
            .expect_step(Step::Spelling, "submit_spelling")?
            .word
            .clone();
        if self.spelling_resolved() {
            return Err(self.reject("submit_spelling", "the spelling step is already resolved"));
        }
        if input.trim().is_empty() {
            warn!(word = %word.word, "Rejected empty spelling input");
            return Err(WordloopError::malformed_input("spelling input is empty"));
        }

        let matched = word.is_spelled_by(input);
        let Some(spelling) = self.spelling.as_mut() else {
            return Err(self.reject("submit_spelling", "no spelling prompt is active"));
        };
        let first_attempt = !spelling.attempted;
        spelling.attempted = true;
        if matched {
            spelling.resolved = true;
            spelling.needs_correction = false;
        } else if first_attempt {
            spelling.needs_correction = true;
        }

        let outcome = match (first_attempt, matched) {
            (true, true) => {
                self.results.spelling_total += 1;
                self.results.spelling_correct += 1;
                self.outcomes.entry(word.key()).or_default().spelling = Some(true);
                SpellingOutcome::Correct
            }
            (true, false) => {
                self.results.spelling_total += 1;
                self.results.record_error(&word.key());
                self.outcomes.entry(word.key()).or_default().spelling = Some(false);
                self.add_relapse(&word);
                SpellingOutcome::Incorrect {
                    correct_spelling: word.word.clone(),
                }
            }
            (false, true) => SpellingOutcome::Corrected,
            (false, false) => SpellingOutcome::StillIncorrect,
        };
        debug!(word = %word.word, first_attempt, matched, "Spelling submitted");
        Ok(outcome)
    }

    /// Leaves a resolved spelling item and moves to the next item.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::InvalidAction` unless a resolved spelling step
    /// is current, or `WordloopError::Persistence` if this finished a phase
    /// and its writes failed.
    pub fn proceed<S: WordStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        self.expect_step(Step::Spelling, "proceed")?;
        if !self.spelling_resolved() {
            return Err(self.reject("proceed", "the spelling step is not resolved yet"));
        }
        self.finish_item(store)
    }

    /// Ends the session without writing anything further.
    pub fn abandon(self) {
        info!(
            user_id = %self.user_id,
            phase = %self.phase,
            completed_items = self.completed_items,
            "Study session abandoned"
        );
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn finish_item<S: WordStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        self.completed_items += 1;
        if self.next_item() {
            return Ok(());
        }
        self.finish_phase(store)
    }

    fn finish_phase<S: WordStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        let finished = self.phase;
        let persisted = if finished == Phase::NewLearn {
            self.ensure_new_word_states(store)
        } else {
            self.apply_level_updates(store)
        };

        let next = self.next_phase();
        info!(from = %finished, to = %next, "Phase complete");
        self.enter_phase(next);

        let completed = if next.is_terminal() {
            self.complete(store)
        } else {
            Ok(())
        };
        match (persisted, completed) {
            (Err(first), Err(second)) => Err(merge_failures(first, second)),
            (persisted, completed) => persisted.and(completed),
        }
    }

    fn next_phase(&self) -> Phase {
        match self.phase {
            Phase::Review if !self.new_words.is_empty() => Phase::NewLearn,
            Phase::NewLearn if !self.new_words.is_empty() => Phase::NewReview,
            Phase::Review | Phase::NewLearn | Phase::NewReview if !self.relapse.is_empty() => {
                Phase::Relapse
            }
            _ => Phase::Complete,
        }
    }

    fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.outcomes.clear();
        self.queue = match phase {
            Phase::NewLearn => self
                .new_words
                .iter()
                .flat_map(|word| {
                    [
                        StudyItem::new(word.clone(), Step::Recall),
                        StudyItem::new(word.clone(), Step::Spelling),
                    ]
                })
                .collect(),
            Phase::Review => two_pass_queue(&self.review_words, &mut self.rng),
            Phase::NewReview => two_pass_queue(&self.new_words, &mut self.rng),
            Phase::Relapse => {
                let words: Vec<StudyWord> = self
                    .relapse
                    .values()
                    .take(self.settings.relapse_limit())
                    .cloned()
                    .collect();
                self.total_items += 2 * words.len();
                two_pass_queue(&words, &mut self.rng)
            }
            Phase::Complete => VecDeque::new(),
        };
        self.next_item();
    }

    fn next_item(&mut self) -> bool {
        self.current = self.queue.pop_front();
        self.answer_shown = false;
        self.spelling = match &self.current {
            Some(item) if item.step == Step::Spelling => Some(SpellingState {
                display_meaning: item.word.pick_meaning(&mut self.rng),
                attempted: false,
                needs_correction: false,
                resolved: false,
            }),
            _ => None,
        };
        self.current.is_some()
    }

    fn add_relapse(&mut self, word: &StudyWord) {
        self.relapse
            .entry(word.key())
            .or_insert_with(|| word.clone());
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    fn ensure_new_word_states<S: WordStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let now = self.clock.now();
        let states: Vec<WordState> = self
            .new_words
            .iter()
            .map(|word| WordState::initial(&word.key(), now))
            .collect();

        let created = store
            .ensure_word_states(&self.user_id, &states)
            .map_err(|e| persistence_failure("ensure_word_states", e))?;
        info!(created, "Initial word states stored");
        Ok(())
    }

    fn apply_level_updates<S: WordStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut updates = Vec::new();
        let mut level_ups = 0;
        for (key, outcome) in &self.outcomes {
            let (Some(recall), Some(spelling)) = (outcome.recall, outcome.spelling) else {
                continue;
            };
            let current = store
                .word_state(&self.user_id, key)
                .map_err(|e| persistence_failure("word_state", e))?
                .unwrap_or_else(|| WordState::zero(key, today));

            let updated = update_level(&current, recall, spelling, now);
            if updated.level > current.level {
                level_ups += 1;
            }
            updates.push(updated);
        }

        if updates.is_empty() {
            return Ok(());
        }
        store
            .upsert_word_states(&self.user_id, &updates)
            .map_err(|e| persistence_failure("upsert_word_states", e))?;

        self.results.level_ups += level_ups;
        info!(
            phase = %self.phase,
            updated = updates.len(),
            level_ups,
            "Level updates stored"
        );
        Ok(())
    }

    fn complete<S: WordStore + ?Sized>(&mut self, store: &mut S) -> Result<()> {
        let record = self.results.summarize(&self.user_id, self.clock.now());
        info!(
            user_id = %record.user_id,
            accuracy = record.spelling_accuracy,
            level_ups = record.level_ups,
            duration_seconds = record.duration_seconds,
            "Study session complete"
        );
        self.record = Some(record.clone());
        store
            .insert_session_record(&record)
            .map_err(|e| persistence_failure("insert_session_record", e))?;
        self.record_persisted = true;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------------

    fn expect_step(&self, step: Step, action: &str) -> Result<&StudyItem> {
        match &self.current {
            Some(item) if item.step == step => Ok(item),
            _ => Err(self.reject(action, self.position())),
        }
    }

    fn reject(&self, action: &str, state: impl fmt::Display) -> WordloopError {
        warn!(action, phase = %self.phase, state = %state, "Rejected session action");
        WordloopError::invalid_action(action, state)
    }

    fn position(&self) -> String {
        match &self.current {
            Some(item) => format!("at the {} step of the {} phase", item.step, self.phase),
            None => format!("in the {} phase", self.phase),
        }
    }
}

/// Recall items for every word, then spelling items, each pass shuffled.
fn two_pass_queue(words: &[StudyWord], rng: &mut SessionRng) -> VecDeque<StudyItem> {
    let mut recall: Vec<&StudyWord> = words.iter().collect();
    recall.shuffle(rng);
    let mut spelling: Vec<&StudyWord> = words.iter().collect();
    spelling.shuffle(rng);

    recall
        .into_iter()
        .map(|word| StudyItem::new(word.clone(), Step::Recall))
        .chain(
            spelling
                .into_iter()
                .map(|word| StudyItem::new(word.clone(), Step::Spelling)),
        )
        .collect()
}

fn persistence_failure(operation: &str, err: WordloopError) -> WordloopError {
    warn!(operation, error = %err, "Store operation failed");
    match err {
        e @ WordloopError::Persistence { .. } => e,
        other => WordloopError::persistence(operation, other),
    }
}

/// Joins two failures from one phase end so neither is lost.
fn merge_failures(first: WordloopError, second: WordloopError) -> WordloopError {
    match (first, second) {
        (
            WordloopError::Persistence {
                operation: first_op,
                message: first_msg,
            },
            WordloopError::Persistence {
                operation: second_op,
                message: second_msg,
            },
        ) => WordloopError::Persistence {
            operation: format!("{first_op} and {second_op}"),
            message: format!("{first_op}: {first_msg}; {second_op}: {second_msg}"),
        },
        (first, _) => first,
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// What a front end needs to render the current screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Current step, `None` once complete.
    pub step: Option<Step>,
    /// Word text, hidden until a spelling attempt was made.
    pub word: Option<String>,
    /// Revealed meanings for recall, the prompt meaning for spelling.
    pub meaning: Option<String>,
    /// Phonetic transcription, shown with the word.
    pub phonetic: Option<String>,
    /// Example sentence, shown with the word.
    pub example: Option<String>,
    /// Whether the recall answer was revealed.
    pub answer_shown: bool,
    /// Whether a correction is expected.
    pub needs_correction: bool,
    /// Whether the spelling step can be left.
    pub spelling_resolved: bool,
    /// Progress through the planned items.
    pub progress: Progress,
    /// The session record once complete.
    pub record: Option<SessionRecord>,
}
