//! Wordloop Daily Report Generation
//!
//! This crate provides types and utilities for summarizing one learner's
//! study day. Reports can be serialized to JSON for programmatic access or
//! rendered to Markdown for human consumption.
//!
//! # Types
//!
//! - [`DailyReport`] - The complete report for one day
//! - [`TaskSummary`] - Reviews and new words scheduled for the day
//! - [`SessionSummary`] - The latest completed session of the day
//! - [`LevelBreakdown`] - How many words sit at each mastery level
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Generate JSON reports with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use wordloop_report::{DailyReport, LevelBreakdown, TaskSummary};
//! use wordloop_report::json::JsonGenerator;
//!
//! let report = DailyReport::builder()
//!     .user_id("local")
//!     .date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap())
//!     .tasks(TaskSummary {
//!         review_count: 4,
//!         new_count: 10,
//!         total_studied: 120,
//!         total_words: 800,
//!     })
//!     .levels(LevelBreakdown::new([30, 40, 30, 20]))
//!     .build()
//!     .unwrap();
//!
//! let json = JsonGenerator::new(&report).generate_pretty().unwrap();
//! assert!(json.contains("\"review_count\": 4"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Day Status
// ============================================================================

/// Where the learner stands for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Nothing is due and no new words are available.
    #[default]
    Idle,
    /// Work is waiting and no session has been completed.
    Pending,
    /// At least one session was completed today.
    Studied,
}

impl DayStatus {
    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Nothing to study",
            Self::Pending => "Not studied yet",
            Self::Studied => "Studied",
        }
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// DailyReport
// ============================================================================

/// One learner's study day.
///
/// The engine types are copied into plain report types here so the report
/// crate has no dependency on the engine; the CLI does the conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyReport {
    /// Learner the report is about.
    pub user_id: String,

    /// Calendar day covered.
    pub date: NaiveDate,

    /// When the report was generated.
    pub generated_at: DateTime<Utc>,

    /// Workload at generation time.
    pub tasks: TaskSummary,

    /// Latest completed session of the day.
    pub session: Option<SessionSummary>,

    /// Mastery levels at generation time.
    pub levels: LevelBreakdown,
}

impl DailyReport {
    /// Creates a new report builder.
    #[must_use]
    pub fn builder() -> DailyReportBuilder {
        DailyReportBuilder::default()
    }

    /// Serializes the report to JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialization` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ReportError::from)
    }

    /// Status of the day.
    #[must_use]
    pub const fn status(&self) -> DayStatus {
        if self.session.is_some() {
            DayStatus::Studied
        } else if self.tasks.is_empty() {
            DayStatus::Idle
        } else {
            DayStatus::Pending
        }
    }

    /// File name stem used when the report is written to disk.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("wordloop-report-{}", self.date.format("%Y-%m-%d"))
    }
}

/// Builder for [`DailyReport`].
#[derive(Debug, Default)]
pub struct DailyReportBuilder {
    user_id: Option<String>,
    date: Option<NaiveDate>,
    generated_at: Option<DateTime<Utc>>,
    tasks: TaskSummary,
    session: Option<SessionSummary>,
    levels: LevelBreakdown,
}

impl DailyReportBuilder {
    /// Sets the learner.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the day covered.
    #[must_use]
    pub const fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the generation time. Defaults to now.
    #[must_use]
    pub const fn generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Sets the workload.
    #[must_use]
    pub const fn tasks(mut self, tasks: TaskSummary) -> Self {
        self.tasks = tasks;
        self
    }

    /// Sets the session of the day, if any.
    #[must_use]
    pub fn session(mut self, session: Option<SessionSummary>) -> Self {
        self.session = session;
        self
    }

    /// Sets the level breakdown.
    #[must_use]
    pub const fn levels(mut self, levels: LevelBreakdown) -> Self {
        self.levels = levels;
        self
    }

    /// Builds the report.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidData` if the learner or date is missing,
    /// or the session accuracy is outside `0.0..=1.0`.
    pub fn build(self) -> Result<DailyReport> {
        let user_id = self
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ReportError::InvalidData("user_id is required".to_string()))?;

        let date = self
            .date
            .ok_or_else(|| ReportError::InvalidData("date is required".to_string()))?;

        if let Some(session) = &self.session {
            if !(0.0..=1.0).contains(&session.spelling_accuracy) {
                return Err(ReportError::InvalidData(format!(
                    "spelling_accuracy {} is outside 0.0..=1.0",
                    session.spelling_accuracy
                )));
            }
        }

        Ok(DailyReport {
            user_id,
            date,
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            tasks: self.tasks,
            session: self.session,
            levels: self.levels,
        })
    }
}

// ============================================================================
// TaskSummary
// ============================================================================

/// Reviews and new words scheduled for the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Due reviews, capped at the daily review limit.
    pub review_count: usize,
    /// New words available, capped at the daily new-word limit.
    pub new_count: usize,
    /// Words the learner has started.
    pub total_studied: usize,
    /// Catalog entries visible to the learner.
    pub total_words: usize,
}

impl TaskSummary {
    /// Returns `true` if nothing is scheduled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.review_count == 0 && self.new_count == 0
    }
}

// ============================================================================
// SessionSummary
// ============================================================================

/// The latest completed session of the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// New words in the session.
    pub new_count: u32,
    /// Reviews in the session.
    pub review_count: u32,
    /// First-attempt spelling accuracy, `0.0..=1.0`.
    pub spelling_accuracy: f64,
    /// Recall steps answered "know".
    pub know: u32,
    /// Recall steps answered "don't know".
    pub dont_know: u32,
    /// Session length.
    pub duration_seconds: u64,
    /// Word with the most spelling errors, empty if none.
    pub hardest_word: String,
    /// Words that moved up a level.
    pub level_ups: u32,
}

impl SessionSummary {
    /// Accuracy as a whole percentage.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        // Clamped to 0..=100 before the cast.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (self.spelling_accuracy.clamp(0.0, 1.0) * 100.0).round() as u32;
        percent
    }

    /// Share of recall steps answered "know", as a whole percentage.
    #[must_use]
    pub fn recall_percent(&self) -> u32 {
        let total = self.know + self.dont_know;
        if total == 0 {
            return 100;
        }
        (self.know * 100 + total / 2) / total
    }
}

// ============================================================================
// LevelBreakdown
// ============================================================================

/// Number of words at each mastery level, lowest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBreakdown {
    /// Word counts for levels 0 through 3.
    pub levels: [u32; 4],
}

impl LevelBreakdown {
    /// Wraps per-level counts.
    #[must_use]
    pub const fn new(levels: [u32; 4]) -> Self {
        Self { levels }
    }

    /// Words with any level.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.levels.iter().sum()
    }

    /// Words at the top level.
    #[must_use]
    pub const fn mastered(&self) -> u32 {
        self.levels[3]
    }

    /// Share of words at `level`, as a whole percentage.
    #[must_use]
    pub fn percent(&self, level: usize) -> u32 {
        let total = self.total();
        match self.levels.get(level) {
            Some(&count) if total > 0 => (count * 100 + total / 2) / total,
            _ => 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    fn session(accuracy: f64) -> SessionSummary {
        SessionSummary {
            new_count: 2,
            review_count: 3,
            spelling_accuracy: accuracy,
            know: 7,
            dont_know: 3,
            duration_seconds: 312,
            hardest_word: "rhythm".to_string(),
            level_ups: 2,
        }
    }

    #[test]
    fn test_builder_requires_user_and_date() {
        let err = DailyReport::builder().date(date()).build().unwrap_err();
        assert!(err.to_string().contains("user_id is required"));

        let err = DailyReport::builder().user_id("local").build().unwrap_err();
        assert!(err.to_string().contains("date is required"));

        let err = DailyReport::builder()
            .user_id("  ")
            .date(date())
            .build()
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidData(_)));
    }

    #[test]
    fn test_builder_rejects_accuracy_out_of_range() {
        let err = DailyReport::builder()
            .user_id("local")
            .date(date())
            .session(Some(session(1.5)))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("spelling_accuracy"));
    }

    #[test]
    fn test_status() {
        let idle = DailyReport::builder()
            .user_id("local")
            .date(date())
            .build()
            .unwrap();
        assert_eq!(idle.status(), DayStatus::Idle);

        let pending = DailyReport::builder()
            .user_id("local")
            .date(date())
            .tasks(TaskSummary {
                new_count: 5,
                ..TaskSummary::default()
            })
            .build()
            .unwrap();
        assert_eq!(pending.status(), DayStatus::Pending);

        let studied = DailyReport::builder()
            .user_id("local")
            .date(date())
            .session(Some(session(0.8)))
            .build()
            .unwrap();
        assert_eq!(studied.status(), DayStatus::Studied);
        assert_eq!(studied.status().to_string(), "Studied");
    }

    #[test]
    fn test_file_stem() {
        let report = DailyReport::builder()
            .user_id("local")
            .date(date())
            .build()
            .unwrap();
        assert_eq!(report.file_stem(), "wordloop-report-2026-02-03");
    }

    #[test]
    fn test_session_percentages() {
        let summary = session(0.67);
        assert_eq!(summary.accuracy_percent(), 67);
        assert_eq!(summary.recall_percent(), 70);

        let empty = SessionSummary::default();
        assert_eq!(empty.recall_percent(), 100);
    }

    #[test]
    fn test_level_breakdown() {
        let levels = LevelBreakdown::new([1, 2, 0, 1]);
        assert_eq!(levels.total(), 4);
        assert_eq!(levels.mastered(), 1);
        assert_eq!(levels.percent(1), 50);
        assert_eq!(levels.percent(9), 0);
        assert_eq!(LevelBreakdown::default().percent(0), 0);
    }
}
