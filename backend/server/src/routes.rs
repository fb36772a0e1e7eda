use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    models::{
        Action, HealthResponse, LogRequest, MessageResponse, NewArticleLog, ReadingTimeResponse,
        UserArticlesResponse,
    },
    state::AppState,
    utils::{distinct_article_ids, reading_time, required},
};

pub const GREETING: &str = "User monitoring service is running";

pub async fn click_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    record(&state, payload, Action::Click, "Failed to log click").await?;

    Ok(Json(MessageResponse {
        message: "Click logged successfully",
    }))
}

pub async fn reading_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    record(&state, payload, Action::Reading, "Failed to log reading time").await?;

    Ok(Json(MessageResponse {
        message: "Reading time logged successfully",
    }))
}

/// Validation happens before the store is touched.
async fn record(
    state: &AppState,
    payload: Result<Json<LogRequest>, JsonRejection>,
    action: Action,
    failure: &'static str,
) -> Result<(), AppError> {
    let entry = new_entry(payload, action)?;

    state
        .store
        .insert(entry)
        .await
        .map_err(AppError::store(failure))?;

    Ok(())
}

fn new_entry(
    payload: Result<Json<LogRequest>, JsonRejection>,
    action: Action,
) -> Result<NewArticleLog, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(%action, error = %rejection, "Rejected log request");
        AppError::InvalidRequest
    })?;

    Ok(NewArticleLog {
        user_id: required(request.user_id)?,
        article_id: required(request.article_id)?,
        action,
    })
}

pub async fn user_articles_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserArticlesResponse>, AppError> {
    let logs = state
        .store
        .find_by_user(&user_id)
        .await
        .map_err(AppError::store("Failed to fetch articles"))?;

    Ok(Json(UserArticlesResponse {
        article_ids: distinct_article_ids(&logs),
    }))
}

pub async fn reading_time_handler(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<String>,
) -> Result<Json<ReadingTimeResponse>, AppError> {
    let logs = state
        .store
        .find_by_article_and_action(&article_id, Action::Reading)
        .await
        .map_err(AppError::store("Failed to fetch reading time"))?;

    Ok(Json(reading_time(article_id, logs.len())))
}

pub async fn greeting_handler() -> &'static str {
    GREETING
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
