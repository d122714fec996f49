use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response};

use super::model::{ModerationRequest, StatusQuery};

fn moderation_error(e: sqlx::Error) -> (StatusCode, axum::Json<ApiResponse<serde_json::Value>>) {
    match e {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Group not found".to_string()),
        ),
        e => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match state.repo.find_by_status(status).await {
        Ok(groups) => (StatusCode::OK, success_to_api_response(groups)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn approve_group(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> impl IntoResponse {
    match state.repo.approve_group(req.group_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "approved": true })),
        ),
        Err(e) => moderation_error(e),
    }
}

#[axum::debug_handler]
pub async fn reject_group(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> impl IntoResponse {
    match state.repo.reject_group(req.group_id, req.reason.as_deref()).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "rejected": true })),
        ),
        Err(e) => moderation_error(e),
    }
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> impl IntoResponse {
    match state.repo.delete_group(req.group_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "deleted": true })),
        ),
        Err(e) => moderation_error(e),
    }
}

#[axum::debug_handler]
pub async fn toggle_featured(
    State(state): State<AppState>,
    Json(req): Json<ModerationRequest>,
) -> impl IntoResponse {
    match state.repo.toggle_featured(req.group_id).await {
        Ok(featured) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({ "featured": featured })),
        ),
        Err(e) => moderation_error(e),
    }
}
