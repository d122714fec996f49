use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    config::Config,
    utils::{error_codes, error_to_api_response},
};

/// 管理接口的令牌校验：x-admin-token请求头必须与配置一致
pub async fn admin_auth(
    State(config): State<Arc<Config>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get("x-admin-token")
        .and_then(|h| h.to_str().ok());

    let authorized = match presented {
        Some(token) => !config.admin_token.is_empty() && token == config.admin_token,
        None => false,
    };

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response::<()>(error_codes::AUTH_FAILED, "Invalid admin token".into()),
        )
            .into_response();
    }

    next.run(req).await
}
