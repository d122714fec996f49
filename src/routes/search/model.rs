use serde::{Deserialize, Serialize};

use crate::database::models::group::ScoredGroup;

/// 搜索接口的查询参数。全部按字符串接收再宽松解析，
/// 非法值回退默认而不是报错。
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub near_me: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub intent: &'static str,
    pub confidence: f64,
    pub search_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_radius_km: Option<f64>,
    pub degraded: bool,
    pub results_count: usize,
    pub page: usize,
    pub limit: usize,
    pub results: Vec<ScoredGroup>,
}
