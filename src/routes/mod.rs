pub mod admin;
pub mod group;
pub mod search;

use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::success_to_api_response;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// 健康检查
pub async fn ping() -> impl IntoResponse {
    success_to_api_response(PingResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
