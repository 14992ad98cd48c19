// HTTP API routes (score ingest, leaderboard, health, metrics).

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::Database;
use crate::error::AppError;
use crate::metrics;
use crate::scores::{SubmitScoreRequest, TOP_SCORES_LIMIT};

// ── Response types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TopScoresResponse {
    pub scores: Vec<i64>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>) -> Router {
    let state = AppState { db };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Scores
        .route("/scores", get(get_scores).post(add_score))
        .with_state(state)
        .layer(axum::middleware::from_fn(metrics::track_requests))
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Math Game API",
    })
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.count_scores().await {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "service": "math-game-backend", "scores": count })),
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn add_score(
    State(state): State<AppState>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = payload?;
    let record = req.into_record()?;

    state.db.add_score(&record).await?;
    metrics::SCORES_SUBMITTED_TOTAL.inc();
    tracing::debug!(score = record.score, "Score stored");

    Ok(Json(MessageResponse {
        message: "Score added successfully",
    }))
}

async fn get_scores(State(state): State<AppState>) -> Result<Json<TopScoresResponse>, AppError> {
    let scores = state.db.top_scores(TOP_SCORES_LIMIT).await?;
    Ok(Json(TopScoresResponse { scores }))
}
