use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::AppState;
use crate::database::GroupStore;
use crate::geo::resolver::resolve_user_location;
use crate::search::engine::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SearchEngine, SearchRequest, SortKey, order_suggestions,
};
use crate::search::intent::classify;
use crate::utils::{client_ip, error_codes, error_to_api_response, success_to_api_response};

use super::model::{SearchQuery, SearchResponse, SuggestQuery};

/// 补全候选的默认条数和上限
const SUGGEST_DEFAULT_LIMIT: usize = 10;
const SUGGEST_MAX_LIMIT: usize = 20;
/// 补全时从存储层多取一些，排序后再截断
const SUGGEST_FETCH_LIMIT: i64 = 50;

/// 半径限制在[1, 配置上限]。上限配置得比1还小时以上限为准，
/// 不能因为配置异常panic
fn clamp_radius(radius: f64, max_radius: f64) -> f64 {
    radius.max(1.0).min(max_radius)
}

#[axum::debug_handler]
pub async fn search_groups(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let q = query.q.unwrap_or_default();

    let lat = query.lat.and_then(|v| v.trim().parse::<f64>().ok());
    let lng = query.lng.and_then(|v| v.trim().parse::<f64>().ok());
    let radius_km = query
        .radius
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|r| clamp_radius(r, state.config.max_search_radius_km));
    let near_me = matches!(
        query.near_me.as_deref().map(str::trim),
        Some("true") | Some("1")
    );
    let page = query
        .page
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = query
        .limit
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let sort = SortKey::parse(query.sort.as_deref());

    let ip = client_ip(&headers, Some(addr.ip()));
    let user = resolve_user_location(lat, lng, ip, &state.geo).await;
    let analysis = classify(&q, user.is_some());

    let request = SearchRequest {
        category: query.category.filter(|c| !c.trim().is_empty()),
        location: query.location.filter(|l| !l.trim().is_empty()),
        radius_km,
        near_me,
        page,
        limit,
        sort,
    };

    let engine = SearchEngine::new(state.repo.clone());
    match engine.run(&analysis, &request, user.as_ref()).await {
        Ok(outcome) => (
            StatusCode::OK,
            success_to_api_response(SearchResponse {
                query: q,
                intent: analysis.intent.as_str(),
                confidence: analysis.confidence,
                search_type: outcome.search_type,
                detected_location: outcome.detected_location,
                effective_radius_km: outcome.effective_radius_km,
                degraded: outcome.degraded,
                results_count: outcome.results_count,
                page,
                limit,
                results: outcome.results,
            }),
        ),
        Err(e) => {
            tracing::error!("search failed including fallback: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                error_to_api_response(
                    error_codes::SEARCH_UNAVAILABLE,
                    "Search is temporarily unavailable".to_string(),
                ),
            )
        }
    }
}

#[axum::debug_handler]
pub async fn search_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> impl IntoResponse {
    let q = query.q.unwrap_or_default().trim().to_string();
    // 太短的前缀直接返回空列表
    if q.chars().count() < 2 {
        return success_to_api_response(Vec::<String>::new());
    }
    let limit = query
        .limit
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(SUGGEST_DEFAULT_LIMIT)
        .clamp(1, SUGGEST_MAX_LIMIT);

    match state.repo.name_suggestions(&q, SUGGEST_FETCH_LIMIT).await {
        Ok(names) => success_to_api_response(order_suggestions(names, &q, limit)),
        Err(e) => {
            // 补全是辅助功能，失败时降级为空结果
            tracing::warn!("suggestions lookup failed: {}", e);
            success_to_api_response(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_is_clamped_to_configured_bounds() {
        assert_eq!(clamp_radius(0.2, 500.0), 1.0);
        assert_eq!(clamp_radius(25.0, 500.0), 25.0);
        assert_eq!(clamp_radius(9999.0, 500.0), 500.0);
    }

    #[test]
    fn degenerate_max_radius_does_not_panic() {
        // 上限配置小于1时取上限而不是panic
        assert_eq!(clamp_radius(25.0, 0.5), 0.5);
    }
}
