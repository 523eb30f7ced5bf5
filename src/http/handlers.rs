use super::state::AppState;
use crate::session::SessionStats;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(session_id: &str) -> Response {
    warn!("Session {} not found", session_id);
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /sessions
/// Stats of every live session
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.registry.list().await;
    (StatusCode::OK, Json(stats))
}

/// GET /sessions/:session_id/status
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.registry.get(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
/// Conversation so far, system prompt excluded
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.registry.get(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.transcript().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /transcripts/:transcript_id
/// A persisted transcript, live or finished
pub async fn get_stored_transcript(
    State(state): State<AppState>,
    Path(transcript_id): Path<String>,
) -> Response {
    match state.store.load(&transcript_id).await {
        Ok(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        Err(e) => {
            warn!("Transcript {} not loaded: {:#}", transcript_id, e);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Transcript {} not found", transcript_id),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/:session_id/stop
/// Stop a call and drop it from the registry
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    info!("Stopping session: {}", session_id);

    let Some(session) = state.registry.remove(&session_id).await else {
        return not_found(&session_id);
    };

    let stats = session.stop().await;
    info!("Session {} stopped in phase {}", session_id, stats.phase);
    (
        StatusCode::OK,
        Json(StopSessionResponse {
            session_id,
            status: "stopped".to_string(),
            stats,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
