//! HTTP API for driving study sessions from a browser front end.
//!
//! # Endpoints
//!
//! - `GET /api/tasks` - Today's review and new-word counts
//! - `POST /api/session/start` - Build today's queue and start a session
//! - `GET /api/session` - Current session view
//! - `POST /api/session/reveal` - Show the answer of a recall item
//! - `POST /api/session/recall` - Submit a recall self-assessment
//! - `POST /api/session/spelling` - Submit a spelling attempt
//! - `POST /api/session/proceed` - Leave a resolved spelling item
//! - `POST /api/session/exit` - Abandon the session
//! - `GET /api/sessions/today` - Latest session record of today
//! - `GET /api/progress` - Level distribution and task counts
//!
//! # Example
//!
//! ```no_run
//! use wordloop_engine::{create_router, AppState, Config, MemoryStore};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default(), MemoryStore::new());
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    count_tasks, session_rng, Clock, Config, LevelDistribution, SessionRecord, SessionSnapshot,
    SpellingOutcome, StudySession, SystemClock, TaskCounts, WordStore, WordloopError,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters of the start endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartParams {
    /// Seed for a reproducible word order.
    pub seed: Option<u64>,
}

/// Request body for the recall endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RecallRequest {
    /// Whether the learner knew the word.
    pub know: bool,
}

/// Request body for the spelling endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SpellingRequest {
    /// What the learner typed.
    pub input: String,
}

/// Response body for the spelling endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellingResponse {
    /// How the attempt was judged.
    pub outcome: SpellingOutcome,
    /// The session after the attempt.
    pub session: SessionSnapshot,
}

/// Response body for the exit endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitResponse {
    /// Whether a session was active and has been discarded.
    pub exited: bool,
}

/// Response body for the progress endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    /// Words per level.
    pub distribution: LevelDistribution,
    /// Words at the top level.
    pub mastered: u32,
    /// Today's workload.
    pub tasks: TaskCounts,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// The store together with the one session it serves.
pub struct Workspace {
    /// Word states, catalog and session log.
    pub store: Box<dyn WordStore>,
    /// The active session, if any.
    pub session: Option<StudySession>,
}

/// Shared application state for the HTTP server.
///
/// Requests serialize on the workspace mutex, so session actions are applied
/// one at a time.
#[derive(Clone)]
pub struct AppState {
    /// Configuration, including the learner and their settings.
    pub config: Config,
    /// Time source for queues, level updates and records.
    pub clock: Arc<dyn Clock>,
    /// Store and active session.
    pub workspace: Arc<Mutex<Workspace>>,
}

impl AppState {
    /// Creates state over `store` using the system clock.
    #[must_use]
    pub fn new(config: Config, store: impl WordStore + 'static) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Creates state with an explicit clock.
    #[must_use]
    pub fn with_clock(
        config: Config,
        store: impl WordStore + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            clock,
            workspace: Arc::new(Mutex::new(Workspace {
                store: Box::new(store),
                session: None,
            })),
        }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
struct ApiError(WordloopError);

impl From<WordloopError> for ApiError {
    fn from(err: WordloopError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WordloopError::EmptyQueue | WordloopError::NoActiveSession => StatusCode::NOT_FOUND,
            WordloopError::InvalidAction { .. } => StatusCode::CONFLICT,
            WordloopError::MalformedInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// All routes live under `/api`, wrapped in request tracing and a permissive
/// CORS layer for local front ends.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/tasks", get(handle_tasks))
        .route("/session", get(handle_session))
        .route("/session/start", post(handle_start))
        .route("/session/reveal", post(handle_reveal))
        .route("/session/recall", post(handle_recall))
        .route("/session/spelling", post(handle_spelling))
        .route("/session/proceed", post(handle_proceed))
        .route("/session/exit", post(handle_exit))
        .route("/sessions/today", get(handle_today))
        .route("/progress", get(handle_progress));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/tasks`.
async fn handle_tasks(State(state): State<Arc<AppState>>) -> Result<Json<TaskCounts>, ApiError> {
    let workspace = state.workspace.lock().await;
    let counts = count_tasks(
        workspace.store.as_ref(),
        &state.config.user_id,
        &state.config.settings,
        state.clock.today(),
    )?;
    Ok(Json(counts))
}

/// Handler for `POST /api/session/start`.
///
/// Replaces any session that is still active.
async fn handle_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut workspace = state.workspace.lock().await;
    if let Some(previous) = workspace.session.take() {
        previous.abandon();
    }

    let session = StudySession::start(
        workspace.store.as_ref(),
        state.config.user_id.clone(),
        state.config.settings,
        Arc::clone(&state.clock),
        session_rng(params.seed),
    )?;
    let snapshot = session.snapshot();
    workspace.session = Some(session);
    Ok(Json(snapshot))
}

/// Handler for `GET /api/session`.
async fn handle_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let workspace = state.workspace.lock().await;
    let session = workspace
        .session
        .as_ref()
        .ok_or(WordloopError::NoActiveSession)?;
    Ok(Json(session.snapshot()))
}

/// Handler for `POST /api/session/reveal`.
async fn handle_reveal(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut workspace = state.workspace.lock().await;
    let session = workspace
        .session
        .as_mut()
        .ok_or(WordloopError::NoActiveSession)?;
    session.reveal()?;
    Ok(Json(session.snapshot()))
}

/// Handler for `POST /api/session/recall`.
async fn handle_recall(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecallRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = with_session_blocking(&state, move |session, store| {
        session.submit_recall(store, request.know)?;
        Ok(session.snapshot())
    })
    .await?;
    Ok(Json(snapshot))
}

/// Handler for `POST /api/session/spelling`.
async fn handle_spelling(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpellingRequest>,
) -> Result<Json<SpellingResponse>, ApiError> {
    let mut workspace = state.workspace.lock().await;
    let session = workspace
        .session
        .as_mut()
        .ok_or(WordloopError::NoActiveSession)?;
    let outcome = session.submit_spelling(&request.input)?;
    Ok(Json(SpellingResponse {
        outcome,
        session: session.snapshot(),
    }))
}

/// Handler for `POST /api/session/proceed`.
async fn handle_proceed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = with_session_blocking(&state, |session, store| {
        session.proceed(store)?;
        Ok(session.snapshot())
    })
    .await?;
    Ok(Json(snapshot))
}

/// Runs a session action that may finish a phase, and so write to the store,
/// on the blocking pool. The workspace stays locked until it returns.
async fn with_session_blocking<T, F>(state: &AppState, action: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut StudySession, &mut (dyn WordStore + 'static)) -> crate::Result<T>
        + Send
        + 'static,
{
    let mut guard = Arc::clone(&state.workspace).lock_owned().await;
    let result = tokio::task::spawn_blocking(move || {
        let Workspace { store, session } = &mut *guard;
        let session = session.as_mut().ok_or(WordloopError::NoActiveSession)?;
        action(session, store.as_mut())
    })
    .await
    .map_err(|e| WordloopError::persistence("session_action", e))?;
    result.map_err(ApiError::from)
}

/// Handler for `POST /api/session/exit`.
///
/// Safe to call with no session active.
async fn handle_exit(State(state): State<Arc<AppState>>) -> Json<ExitResponse> {
    let mut workspace = state.workspace.lock().await;
    let exited = match workspace.session.take() {
        Some(session) => {
            session.abandon();
            true
        }
        None => {
            info!("Exit requested with no active session");
            false
        }
    };
    Json(ExitResponse { exited })
}

/// Handler for `GET /api/sessions/today`.
async fn handle_today(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<SessionRecord>>, ApiError> {
    let workspace = state.workspace.lock().await;
    let record = workspace
        .store
        .session_record_for(&state.config.user_id, state.clock.today())?;
    Ok(Json(record))
}

/// Handler for `GET /api/progress`.
async fn handle_progress(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let workspace = state.workspace.lock().await;
    let user_id = &state.config.user_id;
    let distribution = LevelDistribution::from_states(&workspace.store.word_states(user_id)?);
    let tasks = count_tasks(
        workspace.store.as_ref(),
        user_id,
        &state.config.settings,
        state.clock.today(),
    )?;
    Ok(Json(ProgressResponse {
        distribution,
        mastered: distribution.mastered(),
        tasks,
    }))
}

// ============================================================================
// Tests
// ============================================================================
