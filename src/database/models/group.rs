// 群组实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 审核状态。历史数据的status可能为NULL，视为已通过
pub mod status {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

/// 群组实体，对应groups表的一行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub whatsapp: Option<String>,
    pub social_links: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub featured: bool,
    pub verified: bool,
    pub total_views: i64,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// 是否对公众可见：status为approved或NULL
    pub fn is_publicly_visible(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(s) => s == status::APPROVED,
        }
    }

    /// 是否有可用于距离计算的坐标
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// 参与文本匹配的字段拼接（小写）
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.name.len() + self.description.len() + 32,
        );
        text.push_str(&self.name.to_lowercase());
        text.push(' ');
        text.push_str(&self.description.to_lowercase());
        for category in &self.categories {
            text.push(' ');
            text.push_str(&category.to_lowercase());
        }
        text
    }
}

/// 带距离的搜索结果条目
#[derive(Debug, Clone, Serialize)]
pub struct ScoredGroup {
    #[serde(flatten)]
    pub group: Group,
    /// 与用户或目标地点的距离，公里，保留一位小数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ScoredGroup {
    pub fn without_distance(group: Group) -> Self {
        Self {
            group,
            distance_km: None,
        }
    }
}

/// 公开提交的群组信息，入库后进入pending状态等待审核
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub social_links: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> Group {
        Group {
            id: 1,
            slug: "igbo-union".into(),
            name: "Igbo Union".into(),
            description: "Cultural association".into(),
            address: None,
            city: Some("Lagos".into()),
            region: None,
            country: Some("Nigeria".into()),
            phone: None,
            email: None,
            website: None,
            whatsapp: None,
            social_links: vec![],
            categories: vec!["Cultural".into()],
            tags: vec![],
            lat: Some(6.5244),
            lng: Some(3.3792),
            status: Some(status::APPROVED.into()),
            rejection_reason: None,
            featured: false,
            verified: false,
            total_views: 0,
            total_clicks: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn null_status_counts_as_visible() {
        let mut group = sample_group();
        assert!(group.is_publicly_visible());
        group.status = None;
        assert!(group.is_publicly_visible());
        group.status = Some(status::PENDING.into());
        assert!(!group.is_publicly_visible());
        group.status = Some(status::REJECTED.into());
        assert!(!group.is_publicly_visible());
    }

    #[test]
    fn searchable_text_includes_categories() {
        let group = sample_group();
        let text = group.searchable_text();
        assert!(text.contains("igbo union"));
        assert!(text.contains("cultural"));
    }

    #[test]
    fn scored_group_serializes_flat() {
        let scored = ScoredGroup {
            group: sample_group(),
            distance_km: Some(12.3),
        };
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["slug"], "igbo-union");
        assert_eq!(value["distance_km"], 12.3);

        let plain = ScoredGroup::without_distance(sample_group());
        let value = serde_json::to_value(&plain).unwrap();
        assert!(value.get("distance_km").is_none());
    }
}
