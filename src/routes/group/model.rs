use serde::{Deserialize, Serialize};

use crate::database::models::group::Group;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    pub slug: String,
}

/// 点击上报。click_type区分网站、电话、WhatsApp等出口
#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub slug: String,
    pub click_type: Option<String>,
    pub target_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupListResponse {
    pub groups: Vec<Group>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<String>,
}
