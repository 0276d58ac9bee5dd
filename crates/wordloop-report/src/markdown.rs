//! Markdown report generation.
//!
//! [`MarkdownGenerator`] turns a [`DailyReport`] into a human-readable
//! document with:
//!
//! - A summary table of today's workload
//! - The latest session of the day
//! - The mastery level breakdown
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use wordloop_report::{DailyReport, MarkdownGenerator};
//!
//! let report = DailyReport::builder()
//!     .user_id("local")
//!     .date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Wordloop Daily Report: 2026-02-03"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::{DailyReport, SessionSummary};

/// Width of the level bars, in characters.
const BAR_WIDTH: u32 = 20;

/// Generates Markdown reports from a [`DailyReport`].
pub struct MarkdownGenerator<'a> {
    report: &'a DailyReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a DailyReport) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_session(&mut output);
        self.write_levels(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Wordloop Daily Report: {}\n",
            self.report.date.format("%Y-%m-%d")
        );
    }

    fn write_summary(&self, output: &mut String) {
        let tasks = &self.report.tasks;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(
            output,
            "| Learner | {} |",
            escape_markdown(&self.report.user_id)
        );
        let _ = writeln!(output, "| Status | {} |", self.report.status());
        let _ = writeln!(output, "| Reviews Due | {} |", tasks.review_count);
        let _ = writeln!(output, "| New Words Available | {} |", tasks.new_count);
        let _ = writeln!(
            output,
            "| Words Studied | {} of {} |",
            tasks.total_studied, tasks.total_words
        );
        let _ = writeln!(output);
    }

    fn write_session(&self, output: &mut String) {
        let _ = writeln!(output, "## Today's Session\n");

        let Some(session) = &self.report.session else {
            let _ = writeln!(output, "*No session completed today.*\n");
            return;
        };

        Self::write_session_table(output, session);
    }

    fn write_session_table(output: &mut String, session: &SessionSummary) {
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Reviews | {} |", session.review_count);
        let _ = writeln!(output, "| New Words | {} |", session.new_count);
        let _ = writeln!(
            output,
            "| Spelling Accuracy | {}% |",
            session.accuracy_percent()
        );
        let _ = writeln!(
            output,
            "| Recall | {} know, {} don't know ({}%) |",
            session.know,
            session.dont_know,
            session.recall_percent()
        );
        let _ = writeln!(output, "| Level Ups | {} |", session.level_ups);
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(session.duration_seconds)
        );
        let hardest = if session.hardest_word.is_empty() {
            "-".to_string()
        } else {
            format!("`{}`", session.hardest_word.replace('`', "'"))
        };
        let _ = writeln!(output, "| Hardest Word | {hardest} |");
        let _ = writeln!(output);
    }

    fn write_levels(&self, output: &mut String) {
        let levels = &self.report.levels;
        let _ = writeln!(output, "## Mastery Levels\n");

        if levels.total() == 0 {
            let _ = writeln!(output, "*No words studied yet.*\n");
            return;
        }

        let _ = writeln!(output, "| Level | Words | Share |");
        let _ = writeln!(output, "|-------|-------|-------|");
        for (level, count) in levels.levels.iter().enumerate() {
            let percent = levels.percent(level);
            let _ = writeln!(
                output,
                "| L{level} | {count} | {} {percent}% |",
                format_bar(percent)
            );
        }
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "**Mastered**: {} of {} words\n",
            levels.mastered(),
            levels.total()
        );
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.report.generated_at);
        let _ = writeln!(output, "*Generated by Wordloop at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds to a human-readable string.
///
/// Examples:
/// - 65 seconds -> "1m 5s"
/// - 3661 seconds -> "1h 1m 1s"
/// - 45 seconds -> "45s"
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// A fixed-width bar of filled and empty blocks for a percentage.
fn format_bar(percent: u32) -> String {
    let filled = (percent.min(100) * BAR_WIDTH + 50) / 100;
    let mut bar = String::new();
    for i in 0..BAR_WIDTH {
        bar.push(if i < filled { '█' } else { '░' });
    }
    bar
}

/// Escapes special Markdown characters in text.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::{LevelBreakdown, TaskSummary};

    fn sample_report() -> DailyReport {
        DailyReport::builder()
            .user_id("local")
            .date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap())
            .generated_at(Utc.with_ymd_and_hms(2026, 2, 3, 21, 0, 0).unwrap())
            .tasks(TaskSummary {
                review_count: 3,
                new_count: 0,
                total_studied: 4,
                total_words: 10,
            })
            .session(Some(SessionSummary {
                new_count: 2,
                review_count: 1,
                spelling_accuracy: 0.75,
                know: 5,
                dont_know: 1,
                duration_seconds: 185,
                hardest_word: "rhythm".to_string(),
                level_ups: 1,
            }))
            .levels(LevelBreakdown::new([2, 1, 0, 1]))
            .build()
            .unwrap()
    }

    // ------------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------------

    #[test]
    fn test_generate_contains_title_and_summary() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.starts_with("# Wordloop Daily Report: 2026-02-03\n"));
        assert!(markdown.contains("| Status | Studied |"));
        assert!(markdown.contains("| Reviews Due | 3 |"));
        assert!(markdown.contains("| Words Studied | 4 of 10 |"));
    }

    #[test]
    fn test_generate_contains_session() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.contains("## Today's Session"));
        assert!(markdown.contains("| Spelling Accuracy | 75% |"));
        assert!(markdown.contains("| Recall | 5 know, 1 don't know (83%) |"));
        assert!(markdown.contains("| Duration | 3m 5s |"));
        assert!(markdown.contains("| Hardest Word | `rhythm` |"));
    }

    #[test]
    fn test_generate_contains_levels() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.contains("| L0 | 2 | ██████████░░░░░░░░░░ 50% |"));
        assert!(markdown.contains("| L2 | 0 | ░░░░░░░░░░░░░░░░░░░░ 0% |"));
        assert!(markdown.contains("**Mastered**: 1 of 4 words"));
    }

    #[test]
    fn test_generate_contains_footer() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();
        assert!(markdown.ends_with("*Generated by Wordloop at 2026-02-03 21:00:00 UTC*\n"));
    }

    #[test]
    fn test_empty_report() {
        let report = DailyReport::builder()
            .user_id("local")
            .date(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap())
            .build()
            .unwrap();
        let markdown = MarkdownGenerator::new(&report).generate();

        assert!(markdown.contains("| Status | Nothing to study |"));
        assert!(markdown.contains("*No session completed today.*"));
        assert!(markdown.contains("*No words studied yet.*"));
    }

    #[test]
    fn test_session_without_errors_shows_dash() {
        let mut report = sample_report();
        if let Some(session) = report.session.as_mut() {
            session.hardest_word.clear();
        }
        let markdown = MarkdownGenerator::new(&report).generate();
        assert!(markdown.contains("| Hardest Word | - |"));
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3661), "1h 1m 1s");
        assert_eq!(format_duration(3600), "1h");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(0).chars().filter(|c| *c == '█').count(), 0);
        assert_eq!(format_bar(50).chars().filter(|c| *c == '█').count(), 10);
        assert_eq!(format_bar(100).chars().count(), 20);
        assert_eq!(format_bar(250).chars().filter(|c| *c == '█').count(), 20);
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown("x|y"), "x\\|y");
        assert_eq!(escape_markdown("line1\nline2"), "line1<br>line2");
    }
}
