//! Wordloop study engine
//!
//! Builds the daily queue of due reviews and new words, drives a learner
//! through recall and spelling steps, updates mastery levels and records
//! session statistics. Served over HTTP by [`api`].

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod interval;
pub mod level;
pub mod model;
pub mod queue;
pub mod session;
pub mod store;
pub mod summary;

pub use api::{
    create_router, AppState, ErrorResponse, ExitResponse, ProgressResponse, RecallRequest,
    SpellingRequest, SpellingResponse, StartParams, Workspace,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, Settings, CONFIG_FILE_NAME};
pub use error::{Result, WordloopError};
pub use interval::{interval_days, next_review_date, MAX_LEVEL, REVIEW_INTERVALS};
pub use level::update_level;
pub use model::{word_key, Step, StudyItem, StudyWord, Word, WordState};
pub use queue::{
    build_daily_queue, count_tasks, load_daily_queue, session_rng, DailyQueue, SessionRng,
    TaskCounts,
};
pub use session::{Phase, Progress, SessionSnapshot, SpellingOutcome, StudySession};
pub use store::{JsonFileStore, MemoryStore, WordStore};
pub use summary::{
    hardest_word, LevelDistribution, SelfEvalStats, SessionRecord, SessionResults, SessionType,
};
