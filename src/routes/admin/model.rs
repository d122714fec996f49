use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// 审核操作的请求体。reason只在拒绝时有意义
#[derive(Debug, Deserialize)]
pub struct ModerationRequest {
    pub group_id: i32,
    pub reason: Option<String>,
}
