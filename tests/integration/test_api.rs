//! HTTP API flow tests.
//!
//! Drives a complete session through the router with a JSON file store
//! behind it, the way a browser front end would.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use tower::util::ServiceExt;
use wordloop_engine::{
    create_router, AppState, Config, FixedClock, JsonFileStore, Phase, ProgressResponse,
    SessionRecord, SessionSnapshot, SpellingOutcome, SpellingResponse, Step, TaskCounts, Word,
    WordStore,
};

const WORDS: [(&str, &str); 3] = [("apple", "苹果"), ("pear", "梨"), ("grape", "葡萄")];

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-03T10:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn router_with_store(path: &std::path::Path) -> Router {
    let mut store = JsonFileStore::open(path).expect("Failed to open store");
    store
        .modify("seed", |data| {
            for (i, (word, meaning)) in WORDS.iter().enumerate() {
                data.add_built_in_word(Word::new(i as u64 + 1, *word, *meaning));
            }
            Ok(())
        })
        .expect("Failed to seed store");

    let state = AppState::with_clock(Config::default(), store, Arc::new(FixedClock::new(now())));
    create_router(state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    router.clone().oneshot(request).await.expect("response")
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json body")
}

async fn post_ok<T: serde::de::DeserializeOwned>(
    router: &Router,
    uri: &str,
    body: Option<serde_json::Value>,
) -> T {
    let response = send(router, Method::POST, uri, body).await;
    assert_eq!(response.status(), StatusCode::OK, "POST {uri}");
    json_body(response).await
}

#[tokio::test]
async fn test_complete_session_over_http() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("store.json");
    let router = router_with_store(&path);
    let spelling_of: HashMap<&str, &str> = WORDS.iter().map(|(w, m)| (*m, *w)).collect();

    let tasks: TaskCounts = json_body(send(&router, Method::GET, "/api/tasks", None).await).await;
    assert_eq!(tasks.new_count, 3);

    let mut snapshot: SessionSnapshot = post_ok(&router, "/api/session/start?seed=5", None).await;
    assert_eq!(snapshot.phase, Phase::NewLearn);
    assert_eq!(snapshot.progress.total_items, 12);

    let mut steps = 0;
    while snapshot.phase != Phase::Complete {
        steps += 1;
        assert!(steps < 100, "session did not complete");

        snapshot = match snapshot.step {
            Some(Step::Recall) => {
                let revealed: SessionSnapshot =
                    post_ok(&router, "/api/session/reveal", None).await;
                assert!(revealed.answer_shown);
                post_ok(
                    &router,
                    "/api/session/recall",
                    Some(serde_json::json!({ "know": true })),
                )
                .await
            }
            Some(Step::Spelling) => {
                let meaning = snapshot.meaning.clone().expect("spelling prompt");
                let word = spelling_of[meaning.as_str()];
                let answer: SpellingResponse = post_ok(
                    &router,
                    "/api/session/spelling",
                    Some(serde_json::json!({ "input": word })),
                )
                .await;
                assert_eq!(answer.outcome, SpellingOutcome::Correct);
                assert!(answer.session.spelling_resolved);
                post_ok(&router, "/api/session/proceed", None).await
            }
            None => panic!("incomplete session without a step"),
        };
    }

    let record = snapshot.record.expect("record in final snapshot");
    assert_eq!(record.new_count, 3);
    assert_eq!(record.level_ups, 3);
    assert_eq!(snapshot.progress.percent, 100);

    let today: Option<SessionRecord> =
        json_body(send(&router, Method::GET, "/api/sessions/today", None).await).await;
    assert_eq!(today, Some(record));

    let progress: ProgressResponse =
        json_body(send(&router, Method::GET, "/api/progress", None).await).await;
    assert_eq!(progress.distribution.levels, [0, 3, 0, 0]);
    assert_eq!(progress.tasks.new_count, 0);

    // Everything written through the API is on disk.
    let reopened = JsonFileStore::open(&path).expect("Failed to reopen store");
    assert_eq!(reopened.word_states("local").unwrap().len(), 3);
    let date = NaiveDate::from_ymd_opt(2026, 2, 3).expect("valid date");
    assert!(reopened.session_record_for("local", date).unwrap().is_some());
}

#[tokio::test]
async fn test_actions_after_exit_are_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let router = router_with_store(&dir.path().join("store.json"));

    let _: SessionSnapshot = post_ok(&router, "/api/session/start", None).await;
    let _: SessionSnapshot = post_ok(&router, "/api/session/reveal", None).await;

    let exit: serde_json::Value = post_ok(&router, "/api/session/exit", None).await;
    assert_eq!(exit["exited"], true);

    let response = send(
        &router,
        Method::POST,
        "/api/session/recall",
        Some(serde_json::json!({ "know": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Leaving mid-phase stores nothing.
    let progress: ProgressResponse =
        json_body(send(&router, Method::GET, "/api/progress", None).await).await;
    assert_eq!(progress.distribution.total(), 0);
    assert_eq!(progress.tasks.new_count, 3);
}

#[tokio::test]
async fn test_wrong_step_is_a_conflict() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let router = router_with_store(&dir.path().join("store.json"));

    let snapshot: SessionSnapshot = post_ok(&router, "/api/session/start", None).await;
    assert_eq!(snapshot.step, Some(Step::Recall));

    let response = send(
        &router,
        Method::POST,
        "/api/session/spelling",
        Some(serde_json::json!({ "input": "apple" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let unchanged: SessionSnapshot =
        json_body(send(&router, Method::GET, "/api/session", None).await).await;
    assert_eq!(unchanged, snapshot);
}
