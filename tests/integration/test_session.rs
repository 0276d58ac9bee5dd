//! End-to-end study sessions against the JSON file store.
//!
//! These tests run whole sessions through every phase, then reopen the store
//! file to check what a later run would see.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use wordloop_engine::{
    count_tasks, session_rng, FixedClock, JsonFileStore, LevelDistribution, Phase, Settings,
    Step, StudySession, Word, WordState, WordStore, WordloopError,
};
use wordloop_report::{DailyReport, DayStatus, LevelBreakdown, MarkdownGenerator};

const USER: &str = "local";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-03T10:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).expect("valid date")
}

/// Seeds a store with three catalog words, one of them a due review at level 2.
fn seeded_store(path: &Path) -> JsonFileStore {
    let mut store = JsonFileStore::open(path).expect("Failed to open store");
    store
        .modify("seed", |data| {
            data.add_built_in_word(Word::new(1, "apple", "苹果"));
            data.add_built_in_word(Word::new(2, "pear", "梨"));
            data.add_built_in_word(Word::new(3, "cat", "猫"));
            data.set_word_state(
                USER,
                WordState {
                    level: 2,
                    ..WordState::zero("cat", date(2))
                },
            );
            Ok(())
        })
        .expect("Failed to seed store");
    store
}

fn start(store: &JsonFileStore, clock: &Arc<FixedClock>) -> StudySession {
    StudySession::start(
        store,
        USER,
        Settings::default(),
        clock.clone(),
        session_rng(Some(7)),
    )
    .expect("Failed to start session")
}

/// Answers every item until the session completes. Words in `fail` miss
/// recall and the first spelling attempt outside the relapse phase.
/// Returns the errors the session reported along the way.
fn drive(
    session: &mut StudySession,
    store: &mut JsonFileStore,
    fail: &[&str],
) -> Vec<WordloopError> {
    let mut errors = Vec::new();
    let mut guard = 0;

    while !session.is_complete() {
        guard += 1;
        assert!(guard < 200, "session did not complete");

        let item = session.current().expect("current item").clone();
        let failing =
            session.phase() != Phase::Relapse && fail.contains(&item.word.key().as_str());

        let result = match item.step {
            Step::Recall => {
                session.reveal().expect("reveal");
                session.submit_recall(store, !failing)
            }
            Step::Spelling => {
                if failing {
                    session.submit_spelling("zzz").expect("first attempt");
                }
                session
                    .submit_spelling(&item.word.word)
                    .expect("correct attempt");
                session.proceed(store)
            }
        };
        if let Err(e) = result {
            errors.push(e);
        }
    }

    errors
}

#[test]
fn test_full_session_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    let mut store = seeded_store(&path);
    let clock = Arc::new(FixedClock::new(now()));

    let mut session = start(&store, &clock);
    assert_eq!(session.phase(), Phase::Review);
    clock.advance(Duration::seconds(300));

    let errors = drive(&mut session, &mut store, &["cat"]);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert!(session.record_persisted());

    let record = session.record().expect("record").clone();
    assert_eq!(record.review_count, 1);
    assert_eq!(record.new_count, 2);
    assert_eq!(record.level_ups, 3);
    assert_eq!(record.hardest_word, "cat");
    assert_eq!(record.duration_seconds, 300);
    assert_eq!(record.self_eval_stats.know, 5);
    assert_eq!(record.self_eval_stats.dont_know, 1);
    assert!((record.spelling_accuracy - 0.83).abs() < 1e-9);
    assert_eq!(session.progress().percent, 100);

    let reopened = JsonFileStore::open(&path).expect("Failed to reopen store");

    let cat = reopened.word_state(USER, "cat").unwrap().expect("cat state");
    assert_eq!(cat.level, 2);
    assert_eq!(cat.wrong_count, 1);
    assert_eq!(cat.correct_streak, 1);
    assert_eq!(cat.next_review_at, date(8));

    for word in ["apple", "pear"] {
        let state = reopened.word_state(USER, word).unwrap().expect("new word state");
        assert_eq!(state.level, 1, "{word}");
        assert_eq!(state.next_review_at, date(5), "{word}");
    }

    assert_eq!(
        reopened.session_record_for(USER, date(3)).unwrap(),
        Some(record)
    );
}

#[test]
fn test_nothing_left_after_finishing_the_day() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    let mut store = seeded_store(&path);
    let clock = Arc::new(FixedClock::new(now()));

    let mut session = start(&store, &clock);
    drive(&mut session, &mut store, &[]);

    let reopened = JsonFileStore::open(&path).expect("Failed to reopen store");
    let tasks = count_tasks(&reopened, USER, &Settings::default(), date(3)).unwrap();
    assert_eq!(tasks.review_count, 0);
    assert_eq!(tasks.new_count, 0);
    assert_eq!(tasks.total_studied, 3);
    assert_eq!(tasks.total_words, 3);

    let err = StudySession::start(
        &reopened,
        USER,
        Settings::default(),
        clock,
        session_rng(Some(1)),
    )
    .unwrap_err();
    assert!(matches!(err, WordloopError::EmptyQueue));
}

#[test]
fn test_report_reflects_finished_session() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    let mut store = seeded_store(&path);
    let clock = Arc::new(FixedClock::new(now()));

    let mut session = start(&store, &clock);
    drive(&mut session, &mut store, &[]);

    let levels = LevelDistribution::from_states(&store.word_states(USER).unwrap());
    assert_eq!(levels.levels, [0, 2, 0, 1]);

    let report = DailyReport::builder()
        .user_id(USER)
        .date(date(3))
        .generated_at(now())
        .levels(LevelBreakdown::new(levels.levels))
        .session(store.session_record_for(USER, date(3)).unwrap().map(|r| {
            wordloop_report::SessionSummary {
                new_count: r.new_count,
                review_count: r.review_count,
                spelling_accuracy: r.spelling_accuracy,
                know: r.self_eval_stats.know,
                dont_know: r.self_eval_stats.dont_know,
                duration_seconds: r.duration_seconds,
                hardest_word: r.hardest_word,
                level_ups: r.level_ups,
            }
        }))
        .build()
        .expect("Failed to build report");

    assert_eq!(report.status(), DayStatus::Studied);
    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("| Spelling Accuracy | 100% |"));
    assert!(markdown.contains("**Mastered**: 1 of 3 words"));
}

#[test]
fn test_write_failures_do_not_stop_the_session() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = dir.path().join("data");
    let mut store = JsonFileStore::open(data_dir.join("store.json")).expect("open");
    store
        .modify("seed", |data| {
            data.add_built_in_word(Word::new(1, "apple", "苹果"));
            Ok(())
        })
        .expect("Failed to seed store");

    // A plain file where the store directory should be makes every write fail.
    std::fs::remove_dir_all(&data_dir).expect("remove data dir");
    std::fs::write(&data_dir, "").expect("block data dir");

    let clock = Arc::new(FixedClock::new(now()));
    let mut session = start(&store, &clock);
    let errors = drive(&mut session, &mut store, &[]);

    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, WordloopError::Persistence { .. })));

    // The last phase end lost both its level updates and the record.
    assert!(matches!(
        errors.last(),
        Some(WordloopError::Persistence { operation, .. })
            if operation.contains("upsert_word_states")
                && operation.contains("insert_session_record")
    ));

    assert!(session.is_complete());
    assert!(!session.record_persisted());
    let record = session.record().expect("record");
    assert_eq!(record.level_ups, 0);
    assert_eq!(record.new_count, 1);

    assert!(store.word_states(USER).unwrap().is_empty());
    assert!(store.data().sessions().is_empty());
}

#[test]
fn test_corrupted_store_file_is_reported() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ not json").expect("write corrupted file");

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, WordloopError::Persistence { .. }));
}
