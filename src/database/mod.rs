// 数据库模块
// 包含群组实体定义和存储库操作

pub mod models; // 数据库实体定义
pub mod repositories; // 存储库实现

pub use models::group::{Group, NewGroup, ScoredGroup};
pub use repositories::group::GroupRepository;

use std::future::Future;

/// 群组查询的过滤条件，所有字段都是可选的叠加条件
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    /// 对名称、简介、分类做模糊匹配的文本
    pub text: Option<String>,
    /// 名称精确匹配（大小写不敏感）
    pub name_exact: Option<String>,
    /// 分类过滤
    pub category: Option<String>,
    /// 按城市、地区、国家做文本过滤
    pub location: Option<String>,
}

impl GroupFilter {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// 群组只读存储接口。搜索引擎只依赖这个接口，
/// 测试时可以用内存实现替换Postgres。
pub trait GroupStore: Send + Sync {
    /// 查询所有公开可见的群组，按过滤条件叠加
    fn find_approved(
        &self,
        filter: &GroupFilter,
    ) -> impl Future<Output = Result<Vec<Group>, sqlx::Error>> + Send;

    /// 按slug查询单个公开可见的群组
    fn find_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Group>, sqlx::Error>> + Send;

    /// 查询某坐标半径内的群组，返回（群组，精确距离公里）
    fn find_within_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        filter: &GroupFilter,
    ) -> impl Future<Output = Result<Vec<(Group, f64)>, sqlx::Error>> + Send;

    /// 公开可见群组用到的全部分类
    fn distinct_categories(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;

    /// 按前缀取群组名称，用于搜索补全
    fn name_suggestions(
        &self,
        prefix: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;
}
