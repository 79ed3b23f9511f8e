use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use wq_core::{QuizSummary, StoredQuiz};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub url: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "message": "Wikipedia Quiz Generator API is running!" }))
}

pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateQuizRequest>, JsonRejection>,
) -> Result<Json<StoredQuiz>, ApiError> {
    let Json(request) = payload?;
    info!(url = %request.url, "Processing URL");
    match state
        .pipeline
        .build_and_save(&request.url, state.storage.as_ref())
        .await
    {
        Ok(stored) => Ok(Json(stored)),
        Err(err) => {
            warn!(url = %request.url, kind = err.kind(), error = %err, "Quiz generation failed");
            Err(err.into())
        }
    }
}

pub async fn history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    Ok(Json(state.storage.list().await?))
}

pub async fn get_quiz(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<StoredQuiz>, ApiError> {
    let Path(id) = id?;
    state
        .storage
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quiz not found"))
}
