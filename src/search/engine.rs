//! 搜索引擎：按意图分析结果选择检索策略，统一做排序、去重和分页。
//! 存储层故障时降级为最简单的文本搜索，尽量不让请求失败。

use std::collections::HashSet;

use crate::database::models::group::{Group, ScoredGroup};
use crate::database::{GroupFilter, GroupStore};
use crate::geo::gazetteer;
use crate::geo::resolver::UserLocation;
use crate::search::intent::{SearchAnalysis, SearchIntent};
use crate::utils::{levenshtein_distance, round_distance};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// 以用户坐标为中心的默认搜索半径
pub const USER_RADIUS_KM: f64 = 25.0;
/// 以查询中的地名为中心的默认搜索半径
pub const NAMED_PLACE_RADIUS_KM: f64 = 50.0;

/// 名称模糊匹配允许的最大编辑距离
const FUZZY_MAX_DISTANCE: usize = 3;
/// 模糊和子串两级匹配的结果上限
const EXACT_TIER_LIMIT: usize = 10;

/// 结果排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// 保持策略自身的相关性排序
    Relevance,
    Distance,
    Newest,
    Oldest,
    Name,
    Views,
}

impl SortKey {
    /// 宽松解析，未知值退回Relevance
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("distance") => SortKey::Distance,
            Some("newest") => SortKey::Newest,
            Some("oldest") => SortKey::Oldest,
            Some("name") => SortKey::Name,
            Some("views") | Some("popular") => SortKey::Views,
            _ => SortKey::Relevance,
        }
    }
}

/// 除查询文本外的搜索参数
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub category: Option<String>,
    pub location: Option<String>,
    pub radius_km: Option<f64>,
    /// 强制以用户位置为中心搜索，忽略意图分类
    pub near_me: bool,
    pub page: usize,
    pub limit: usize,
    pub sort: SortKey,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            category: None,
            location: None,
            radius_km: None,
            near_me: false,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortKey::Relevance,
        }
    }
}

/// 一次搜索的最终结果
#[derive(Debug)]
pub struct SearchOutcome {
    /// 当前页的结果
    pub results: Vec<ScoredGroup>,
    /// 分页前的总结果数
    pub results_count: usize,
    /// 实际执行的策略
    pub search_type: &'static str,
    /// 从查询或参数中识别出的地名
    pub detected_location: Option<String>,
    /// 地理搜索实际使用的半径
    pub effective_radius_km: Option<f64>,
    /// 主策略失败后走了降级路径
    pub degraded: bool,
}

/// 精确名称查询的三级匹配，前一级有结果就不再往下走
#[derive(Debug, Clone, Copy)]
enum ExactTier {
    Equality,
    Fuzzy,
    Substring,
}

const EXACT_TIERS: [ExactTier; 3] = [ExactTier::Equality, ExactTier::Fuzzy, ExactTier::Substring];

pub struct SearchEngine<S: GroupStore> {
    store: S,
}

impl<S: GroupStore> SearchEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 执行搜索。主策略失败时降级为文本搜索，只有降级也失败才返回错误
    pub async fn run(
        &self,
        analysis: &SearchAnalysis,
        request: &SearchRequest,
        user: Option<&UserLocation>,
    ) -> Result<SearchOutcome, sqlx::Error> {
        match self.execute(analysis, request, user).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(
                    intent = analysis.intent.as_str(),
                    "search strategy failed, falling back to text search: {}",
                    e
                );
                let text = if analysis.clean_query.is_empty() {
                    analysis.original_query.trim().to_string()
                } else {
                    analysis.clean_query.clone()
                };
                let mut filter = GroupFilter::default();
                if !text.is_empty() {
                    filter.text = Some(text);
                }
                filter.category = request.category.clone();
                let groups = self.store.find_approved(&filter).await?;
                let results = plain(groups);
                let mut outcome = self.finalize(results, request, "general_text", None, None);
                outcome.degraded = true;
                Ok(outcome)
            }
        }
    }

    async fn execute(
        &self,
        analysis: &SearchAnalysis,
        request: &SearchRequest,
        user: Option<&UserLocation>,
    ) -> Result<SearchOutcome, sqlx::Error> {
        // 显式的"附近"请求优先于意图分类
        if request.near_me {
            if let Some(user) = user {
                let radius = request.radius_km.unwrap_or(USER_RADIUS_KM);
                let mut filter = GroupFilter::default();
                if !analysis.clean_query.is_empty() {
                    filter.text = Some(analysis.clean_query.clone());
                }
                filter.category = request.category.clone();
                let rows = self
                    .store
                    .find_within_radius(user.latitude, user.longitude, radius, &filter)
                    .await?;
                let results = geographic(rows);
                return Ok(self.finalize(results, request, "category_nearby", None, Some(radius)));
            }
        }

        match analysis.intent {
            SearchIntent::Browse => {
                let filter = GroupFilter {
                    category: request.category.clone(),
                    location: request.location.clone(),
                    ..GroupFilter::default()
                };
                let groups = self.store.find_approved(&filter).await?;
                let results = plain(groups);
                Ok(self.finalize(results, request, "browse", None, None))
            }
            SearchIntent::ExactName => {
                let results = self.exact_name_cascade(&analysis.clean_query).await?;
                let results = filter_category(results, request.category.as_deref());
                Ok(self.finalize(results, request, "exact_name", None, None))
            }
            SearchIntent::LocationSpecific => {
                self.location_specific(analysis, request).await
            }
            SearchIntent::CategoryNearby => {
                let Some(user) = user else {
                    // 分类器保证有位置才给出这个意图，这里兜底退回文本
                    return self.general_text(analysis, request).await;
                };
                let radius = request.radius_km.unwrap_or(USER_RADIUS_KM);
                let mut filter = GroupFilter::default();
                if !analysis.clean_query.is_empty() {
                    filter.text = Some(analysis.clean_query.clone());
                }
                filter.category = request.category.clone();
                let rows = self
                    .store
                    .find_within_radius(user.latitude, user.longitude, radius, &filter)
                    .await?;
                let results = geographic(rows);
                Ok(self.finalize(results, request, "category_nearby", None, Some(radius)))
            }
            SearchIntent::GeneralText => self.general_text(analysis, request).await,
        }
    }

    /// 精确名称的三级匹配：等值 > 模糊 > 子串
    async fn exact_name_cascade(&self, name: &str) -> Result<Vec<ScoredGroup>, sqlx::Error> {
        for tier in EXACT_TIERS {
            let groups = match tier {
                ExactTier::Equality => {
                    let filter = GroupFilter {
                        name_exact: Some(name.to_string()),
                        ..GroupFilter::default()
                    };
                    self.store.find_approved(&filter).await?
                }
                ExactTier::Fuzzy => {
                    let all = self.store.find_approved(&GroupFilter::default()).await?;
                    fuzzy_matches(all, name)
                }
                ExactTier::Substring => {
                    let filter = GroupFilter::from_text(name);
                    let matches = self.store.find_approved(&filter).await?;
                    substring_ranked(matches, name)
                }
            };
            if !groups.is_empty() {
                return Ok(groups.into_iter().map(ScoredGroup::without_distance).collect());
            }
        }
        Ok(Vec::new())
    }

    async fn location_specific(
        &self,
        analysis: &SearchAnalysis,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, sqlx::Error> {
        let location = analysis.location.clone().unwrap_or_default();

        if let Some(entry) = gazetteer::lookup_place(&location) {
            let radius = request.radius_km.unwrap_or_else(|| named_place_radius(entry));
            let mut filter = GroupFilter::default();
            if !analysis.clean_query.is_empty() {
                filter.text = Some(analysis.clean_query.clone());
            }
            filter.category = request.category.clone();
            let rows = self
                .store
                .find_within_radius(entry.lat, entry.lng, radius, &filter)
                .await?;
            let results = geographic(rows);
            return Ok(self.finalize(
                results,
                request,
                "location_specific",
                Some(location),
                Some(radius),
            ));
        }

        // 州名等没有坐标的地名，退回按地址字段过滤的文本搜索
        let mut filter = GroupFilter {
            location: Some(location.clone()),
            category: request.category.clone(),
            ..GroupFilter::default()
        };
        if !analysis.clean_query.is_empty() {
            filter.text = Some(analysis.clean_query.clone());
        }
        let groups = self.store.find_approved(&filter).await?;
        let results = plain(groups);
        Ok(self.finalize(results, request, "location_specific", Some(location), None))
    }

    async fn general_text(
        &self,
        analysis: &SearchAnalysis,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, sqlx::Error> {
        let mut filter = GroupFilter {
            category: request.category.clone(),
            location: request.location.clone(),
            ..GroupFilter::default()
        };
        if !analysis.clean_query.is_empty() {
            filter.text = Some(analysis.clean_query.clone());
        }
        let groups = self.store.find_approved(&filter).await?;
        let results = plain(groups);
        Ok(self.finalize(results, request, "general_text", None, None))
    }

    /// 去重、排序、分页的统一出口
    fn finalize(
        &self,
        results: Vec<ScoredGroup>,
        request: &SearchRequest,
        search_type: &'static str,
        detected_location: Option<String>,
        effective_radius_km: Option<f64>,
    ) -> SearchOutcome {
        let mut results = dedup_by_id(results);
        apply_sort(&mut results, request.sort);
        let results_count = results.len();
        let results = paginate(results, request.page, request.limit);
        SearchOutcome {
            results,
            results_count,
            search_type,
            detected_location,
            effective_radius_km,
            degraded: false,
        }
    }
}

/// 地名搜索的默认半径：城市级坐标较粗，城市自身的半径
/// 不足默认值时补齐，超过时沿用城市的
fn named_place_radius(entry: &gazetteer::PlaceEntry) -> f64 {
    entry.radius_km.max(NAMED_PLACE_RADIUS_KM)
}

/// 非地理结果：按名称排序，不带距离
fn plain(mut groups: Vec<Group>) -> Vec<ScoredGroup> {
    groups.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    groups.into_iter().map(ScoredGroup::without_distance).collect()
}

/// 地理结果：距离近的在前，同距离时已认证、精选的在前。
/// 展示用的距离保留一位小数，排序使用原始距离。
fn geographic(mut rows: Vec<(Group, f64)>) -> Vec<ScoredGroup> {
    rows.sort_by(|(a, da), (b, db)| {
        da.total_cmp(db)
            .then_with(|| b.verified.cmp(&a.verified))
            .then_with(|| b.featured.cmp(&a.featured))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    rows.into_iter()
        .map(|(group, distance)| ScoredGroup {
            group,
            distance_km: Some(round_distance(distance)),
        })
        .collect()
}

/// 模糊名称匹配：编辑距离不超过阈值，距离小的在前
fn fuzzy_matches(groups: Vec<Group>, name: &str) -> Vec<Group> {
    let target = name.to_lowercase();
    let mut scored: Vec<(usize, Group)> = groups
        .into_iter()
        .filter_map(|g| {
            let distance = levenshtein_distance(&g.name.to_lowercase(), &target);
            (distance > 0 && distance <= FUZZY_MAX_DISTANCE).then_some((distance, g))
        })
        .collect();
    scored.sort_by(|(da, a), (db, b)| {
        da.cmp(db)
            .then_with(|| b.featured.cmp(&a.featured))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.into_iter().take(EXACT_TIER_LIMIT).map(|(_, g)| g).collect()
}

/// 子串匹配的排序：名称完全相等 > 名称包含 > 简介包含，
/// 同级内精选的在前，再按名称
fn substring_ranked(groups: Vec<Group>, name: &str) -> Vec<Group> {
    let target = name.to_lowercase();
    let mut scored: Vec<(u8, Group)> = groups
        .into_iter()
        .map(|g| {
            let lowered = g.name.to_lowercase();
            let rank = if lowered == target {
                0
            } else if lowered.contains(&target) {
                1
            } else {
                2
            };
            (rank, g)
        })
        .collect();
    scored.sort_by(|(ra, a), (rb, b)| {
        ra.cmp(rb)
            .then_with(|| b.featured.cmp(&a.featured))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.into_iter().take(EXACT_TIER_LIMIT).map(|(_, g)| g).collect()
}

/// 按分类在内存中过滤（大小写不敏感）
fn filter_category(results: Vec<ScoredGroup>, category: Option<&str>) -> Vec<ScoredGroup> {
    let Some(category) = category else {
        return results;
    };
    results
        .into_iter()
        .filter(|r| {
            r.group
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
        })
        .collect()
}

/// 同一个群组从多条路径进入结果时只保留第一条
fn dedup_by_id(results: Vec<ScoredGroup>) -> Vec<ScoredGroup> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.group.id))
        .collect()
}

fn apply_sort(results: &mut [ScoredGroup], sort: SortKey) {
    match sort {
        SortKey::Relevance => {}
        SortKey::Distance => {
            // 没有距离的条目排在最后
            results.sort_by(|a, b| match (a.distance_km, b.distance_km) {
                (Some(da), Some(db)) => da
                    .total_cmp(&db)
                    .then_with(|| a.group.name.cmp(&b.group.name))
                    .then_with(|| a.group.id.cmp(&b.group.id)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.group.name.cmp(&b.group.name).then(a.group.id.cmp(&b.group.id)),
            });
        }
        SortKey::Newest => {
            results.sort_by(|a, b| {
                b.group
                    .created_at
                    .cmp(&a.group.created_at)
                    .then_with(|| a.group.id.cmp(&b.group.id))
            });
        }
        SortKey::Oldest => {
            results.sort_by(|a, b| {
                a.group
                    .created_at
                    .cmp(&b.group.created_at)
                    .then_with(|| a.group.id.cmp(&b.group.id))
            });
        }
        SortKey::Name => {
            results.sort_by(|a, b| a.group.name.cmp(&b.group.name).then(a.group.id.cmp(&b.group.id)));
        }
        SortKey::Views => {
            results.sort_by(|a, b| {
                b.group
                    .total_views
                    .cmp(&a.group.total_views)
                    .then_with(|| a.group.id.cmp(&b.group.id))
            });
        }
    }
}

fn paginate(results: Vec<ScoredGroup>, page: usize, limit: usize) -> Vec<ScoredGroup> {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    // page来自宽松解析的查询参数，乘法必须防溢出
    let offset = page.saturating_sub(1).saturating_mul(limit);
    results.into_iter().skip(offset).take(limit).collect()
}

/// 补全候选的排序：前缀命中 > 名称短的 > 字母序，去重后截断
pub fn order_suggestions(names: Vec<String>, prefix: &str, limit: usize) -> Vec<String> {
    let target = prefix.to_lowercase();
    let mut seen = HashSet::new();
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|n| seen.insert(n.to_lowercase()))
        .collect();
    names.sort_by(|a, b| {
        let a_prefix = a.to_lowercase().starts_with(&target);
        let b_prefix = b.to_lowercase().starts_with(&target);
        b_prefix
            .cmp(&a_prefix)
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| a.cmp(b))
    });
    names.truncate(limit);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::group::status;
    use crate::search::intent::classify;
    use crate::utils::calculate_distance_km;
    use chrono::{TimeZone, Utc};

    fn group(id: i32, name: &str) -> Group {
        Group {
            id,
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: String::new(),
            address: None,
            city: None,
            region: None,
            country: None,
            phone: None,
            email: None,
            website: None,
            whatsapp: None,
            social_links: vec![],
            categories: vec![],
            tags: vec![],
            lat: None,
            lng: None,
            status: Some(status::APPROVED.into()),
            rejection_reason: None,
            featured: false,
            verified: false,
            total_views: 0,
            total_clicks: 0,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(id as i64),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn located(id: i32, name: &str, lat: f64, lng: f64) -> Group {
        let mut g = group(id, name);
        g.lat = Some(lat);
        g.lng = Some(lng);
        g
    }

    /// 内存存储，和Postgres实现保持相同的过滤语义
    struct MemoryGroupStore {
        groups: Vec<Group>,
    }

    fn matches_filter(g: &Group, filter: &GroupFilter) -> bool {
        if let Some(name) = &filter.name_exact {
            if !g.name.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        if let Some(text) = &filter.text {
            if !g.searchable_text().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &filter.category {
            if !g.categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                return false;
            }
        }
        if let Some(location) = &filter.location {
            let needle = location.to_lowercase();
            let hit = [&g.city, &g.region, &g.country]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }

    impl GroupStore for MemoryGroupStore {
        async fn find_approved(&self, filter: &GroupFilter) -> Result<Vec<Group>, sqlx::Error> {
            let mut out: Vec<Group> = self
                .groups
                .iter()
                .filter(|g| g.is_publicly_visible() && matches_filter(g, filter))
                .cloned()
                .collect();
            out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            Ok(out)
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, sqlx::Error> {
            Ok(self
                .groups
                .iter()
                .find(|g| g.is_publicly_visible() && g.slug == slug)
                .cloned())
        }

        async fn find_within_radius(
            &self,
            lat: f64,
            lng: f64,
            radius_km: f64,
            filter: &GroupFilter,
        ) -> Result<Vec<(Group, f64)>, sqlx::Error> {
            Ok(self
                .groups
                .iter()
                .filter(|g| g.is_publicly_visible() && matches_filter(g, filter))
                .filter_map(|g| {
                    let (glat, glng) = g.coordinates()?;
                    let d = calculate_distance_km(lat, lng, glat, glng);
                    (d <= radius_km).then(|| (g.clone(), d))
                })
                .collect())
        }

        async fn distinct_categories(&self) -> Result<Vec<String>, sqlx::Error> {
            let mut cats: Vec<String> = self
                .groups
                .iter()
                .filter(|g| g.is_publicly_visible())
                .flat_map(|g| g.categories.iter().cloned())
                .collect();
            cats.sort();
            cats.dedup();
            Ok(cats)
        }

        async fn name_suggestions(&self, prefix: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
            let needle = prefix.to_lowercase();
            Ok(self
                .groups
                .iter()
                .filter(|g| g.is_publicly_visible() && g.name.to_lowercase().contains(&needle))
                .map(|g| g.name.clone())
                .take(limit as usize)
                .collect())
        }
    }

    /// 地理查询必定失败的存储，用于验证降级路径
    struct FlakyGeoStore {
        inner: MemoryGroupStore,
    }

    impl GroupStore for FlakyGeoStore {
        async fn find_approved(&self, filter: &GroupFilter) -> Result<Vec<Group>, sqlx::Error> {
            self.inner.find_approved(filter).await
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, sqlx::Error> {
            self.inner.find_by_slug(slug).await
        }

        async fn find_within_radius(
            &self,
            _lat: f64,
            _lng: f64,
            _radius_km: f64,
            _filter: &GroupFilter,
        ) -> Result<Vec<(Group, f64)>, sqlx::Error> {
            Err(sqlx::Error::Protocol("geo backend down".into()))
        }

        async fn distinct_categories(&self) -> Result<Vec<String>, sqlx::Error> {
            self.inner.distinct_categories().await
        }

        async fn name_suggestions(&self, prefix: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
            self.inner.name_suggestions(prefix, limit).await
        }
    }

    fn lagos_user() -> UserLocation {
        UserLocation {
            latitude: 6.5244,
            longitude: 3.3792,
            city: Some("Lagos".into()),
            country: Some("Nigeria".into()),
            source: "explicit",
        }
    }

    #[tokio::test]
    async fn browse_returns_only_visible_groups() {
        let mut pending = group(3, "Hidden Club");
        pending.status = Some(status::PENDING.into());
        let store = MemoryGroupStore {
            groups: vec![group(1, "Beta"), group(2, "Alpha"), pending],
        };
        let engine = SearchEngine::new(store);

        let outcome = engine
            .run(&classify("", false), &SearchRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "browse");
        assert_eq!(outcome.results_count, 2);
        let names: Vec<&str> = outcome.results.iter().map(|r| r.group.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn exact_name_equality_tier_wins() {
        let store = MemoryGroupStore {
            groups: vec![
                group(1, "Lagos University"),
                group(2, "Lagos University Alumni"),
            ],
        };
        let engine = SearchEngine::new(store);

        let outcome = engine
            .run(&classify("Lagos University", false), &SearchRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "exact_name");
        assert_eq!(outcome.results_count, 1);
        assert_eq!(outcome.results[0].group.name, "Lagos University");
        assert!(outcome.results[0].distance_km.is_none());
    }

    #[tokio::test]
    async fn exact_name_falls_through_to_fuzzy() {
        let store = MemoryGroupStore {
            groups: vec![
                group(1, "Redeemed Christian Church of God"),
                group(2, "Completely Different Society"),
            ],
        };
        let engine = SearchEngine::new(store);

        // 查询比库里的名称多一个字母
        let analysis = SearchAnalysis {
            original_query: "Redeemed Christian Church of Gods".into(),
            intent: SearchIntent::ExactName,
            clean_query: "Redeemed Christian Church of Gods".into(),
            location: None,
            confidence: 0.9,
        };
        let outcome = engine.run(&analysis, &SearchRequest::default(), None).await.unwrap();
        assert_eq!(outcome.results_count, 1);
        assert_eq!(outcome.results[0].group.name, "Redeemed Christian Church of God");
    }

    #[tokio::test]
    async fn exact_name_substring_tier_ranks_name_hits_first() {
        let mut featured = group(1, "Unity Gym Annex");
        featured.featured = true;
        let mut description_hit = group(2, "Fitness Partners");
        description_hit.description = "The Unity Gym community branch".into();
        let store = MemoryGroupStore {
            groups: vec![featured, description_hit, group(3, "Unity Gym Abuja")],
        };
        let engine = SearchEngine::new(store);

        let analysis = SearchAnalysis {
            original_query: "Unity Gym".into(),
            intent: SearchIntent::ExactName,
            clean_query: "Unity Gym".into(),
            location: None,
            confidence: 0.9,
        };
        let outcome = engine.run(&analysis, &SearchRequest::default(), None).await.unwrap();
        let names: Vec<&str> = outcome.results.iter().map(|r| r.group.name.as_str()).collect();
        // 名称命中在前，精选的优先，简介命中最后
        assert_eq!(names, vec!["Unity Gym Annex", "Unity Gym Abuja", "Fitness Partners"]);
    }

    #[tokio::test]
    async fn location_search_orders_by_distance_with_rounding() {
        let store = MemoryGroupStore {
            groups: vec![
                // 以拉各斯为中心，一近一远，一个超出半径，一个没有坐标
                located(1, "Far Fellowship", 6.80, 3.60),
                located(2, "Near Fellowship", 6.53, 3.38),
                located(3, "Ibadan Fellowship", 7.3775, 3.9470),
                group(4, "No Coordinates Fellowship"),
            ],
        };
        let engine = SearchEngine::new(store);

        let outcome = engine
            .run(&classify("fellowship in Lagos", false), &SearchRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "location_specific");
        assert_eq!(outcome.detected_location.as_deref(), Some("lagos"));
        assert_eq!(outcome.effective_radius_km, Some(NAMED_PLACE_RADIUS_KM));
        assert_eq!(outcome.results_count, 2);
        assert_eq!(outcome.results[0].group.name, "Near Fellowship");

        let distances: Vec<f64> = outcome
            .results
            .iter()
            .map(|r| r.distance_km.unwrap())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        for d in distances {
            // 展示距离保留一位小数
            assert!((d * 10.0 - (d * 10.0).round()).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn state_name_falls_back_to_address_filter() {
        let mut awka = group(1, "Awka Traders Guild");
        awka.region = Some("Anambra".into());
        let mut lagos = group(2, "Lagos Traders Guild");
        lagos.region = Some("Lagos".into());
        let store = MemoryGroupStore {
            groups: vec![awka, lagos],
        };
        let engine = SearchEngine::new(store);

        // anambra是已知地名但没有坐标
        let outcome = engine
            .run(&classify("traders in Anambra", false), &SearchRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "location_specific");
        assert!(outcome.effective_radius_km.is_none());
        assert_eq!(outcome.results_count, 1);
        assert_eq!(outcome.results[0].group.name, "Awka Traders Guild");
    }

    #[tokio::test]
    async fn category_nearby_uses_user_location() {
        let mut near = located(1, "Surulere Tennis Stars", 6.50, 3.36);
        near.description = "tennis club for everyone".into();
        let mut far = located(2, "Kano Tennis Stars", 12.0022, 8.5920);
        far.description = "tennis club in the north".into();
        let store = MemoryGroupStore {
            groups: vec![near, far],
        };
        let engine = SearchEngine::new(store);

        let user = lagos_user();
        let outcome = engine
            .run(&classify("tennis club", true), &SearchRequest::default(), Some(&user))
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "category_nearby");
        assert_eq!(outcome.effective_radius_km, Some(USER_RADIUS_KM));
        assert_eq!(outcome.results_count, 1);
        assert_eq!(outcome.results[0].group.name, "Surulere Tennis Stars");
    }

    #[tokio::test]
    async fn near_me_overrides_intent() {
        let near = located(1, "Lagos Book Circle", 6.53, 3.38);
        let far = located(2, "Abuja Book Circle", 9.0765, 7.3986);
        let store = MemoryGroupStore {
            groups: vec![near, far],
        };
        let engine = SearchEngine::new(store);

        let request = SearchRequest {
            near_me: true,
            ..SearchRequest::default()
        };
        let user = lagos_user();
        // "book circle"本来会走普通文本搜索
        let outcome = engine
            .run(&classify("book circle", true), &request, Some(&user))
            .await
            .unwrap();
        assert_eq!(outcome.search_type, "category_nearby");
        assert_eq!(outcome.results_count, 1);
        assert_eq!(outcome.results[0].group.name, "Lagos Book Circle");
    }

    #[tokio::test]
    async fn geo_failure_degrades_to_text_search() {
        let mut church = located(1, "Enugu Grace Church", 6.52, 7.51);
        church.description = "church in the heart of enugu".into();
        let store = FlakyGeoStore {
            inner: MemoryGroupStore {
                groups: vec![church],
            },
        };
        let engine = SearchEngine::new(store);

        let outcome = engine
            .run(&classify("church in Enugu", false), &SearchRequest::default(), None)
            .await
            .unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.search_type, "general_text");
        assert_eq!(outcome.results_count, 1);
    }

    #[tokio::test]
    async fn pagination_splits_results() {
        let groups: Vec<Group> = (1..=5).map(|i| group(i, &format!("Group {}", i))).collect();
        let store = MemoryGroupStore { groups };
        let engine = SearchEngine::new(store);

        let request = SearchRequest {
            page: 2,
            limit: 2,
            ..SearchRequest::default()
        };
        let outcome = engine
            .run(&classify("", false), &request, None)
            .await
            .unwrap();
        assert_eq!(outcome.results_count, 5);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].group.name, "Group 3");
    }

    #[tokio::test]
    async fn huge_page_number_returns_empty_page() {
        let store = MemoryGroupStore {
            groups: vec![group(1, "Alpha"), group(2, "Beta")],
        };
        let engine = SearchEngine::new(store);

        // page直接来自查询串，极端值不能让偏移量计算溢出
        let request = SearchRequest {
            page: usize::MAX,
            limit: 20,
            ..SearchRequest::default()
        };
        let outcome = engine.run(&classify("", false), &request, None).await.unwrap();
        assert_eq!(outcome.results_count, 2);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn oversized_limit_is_capped() {
        let groups: Vec<Group> = (1..=120).map(|i| group(i, &format!("Group {:03}", i))).collect();
        let store = MemoryGroupStore { groups };
        let engine = SearchEngine::new(store);

        let request = SearchRequest {
            limit: 500,
            ..SearchRequest::default()
        };
        let outcome = engine.run(&classify("", false), &request, None).await.unwrap();
        assert_eq!(outcome.results_count, 120);
        assert_eq!(outcome.results.len(), MAX_PAGE_SIZE);
    }

    #[test]
    fn named_place_radius_floors_at_default() {
        let small_city = crate::geo::gazetteer::PlaceEntry {
            name: "smalltown",
            lat: 6.0,
            lng: 7.0,
            radius_km: 12.0,
        };
        assert_eq!(named_place_radius(&small_city), NAMED_PLACE_RADIUS_KM);

        let metro = crate::geo::gazetteer::PlaceEntry {
            name: "megacity",
            lat: 6.0,
            lng: 7.0,
            radius_km: 80.0,
        };
        assert_eq!(named_place_radius(&metro), 80.0);
    }

    #[tokio::test]
    async fn newest_sort_reverses_creation_order() {
        let store = MemoryGroupStore {
            groups: vec![group(1, "Old"), group(2, "Middle"), group(3, "New")],
        };
        let engine = SearchEngine::new(store);

        let request = SearchRequest {
            sort: SortKey::Newest,
            ..SearchRequest::default()
        };
        let outcome = engine.run(&classify("", false), &request, None).await.unwrap();
        let names: Vec<&str> = outcome.results.iter().map(|r| r.group.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Middle", "Old"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut first = ScoredGroup::without_distance(group(1, "Duplicated"));
        first.distance_km = Some(1.0);
        let second = ScoredGroup::without_distance(group(1, "Duplicated"));
        let third = ScoredGroup::without_distance(group(2, "Unique"));
        let out = dedup_by_id(vec![first, second, third]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].distance_km, Some(1.0));
    }

    #[test]
    fn sort_key_parses_leniently() {
        assert_eq!(SortKey::parse(Some("Distance")), SortKey::Distance);
        assert_eq!(SortKey::parse(Some("popular")), SortKey::Views);
        assert_eq!(SortKey::parse(Some("banana")), SortKey::Relevance);
        assert_eq!(SortKey::parse(None), SortKey::Relevance);
    }

    #[test]
    fn suggestions_prefer_prefix_then_length() {
        let names = vec![
            "Lagos Runners".to_string(),
            "Greater Lagos Society".to_string(),
            "Lagos Chess Club".to_string(),
            "lagos runners".to_string(),
        ];
        let out = order_suggestions(names, "lagos", 10);
        assert_eq!(
            out,
            vec![
                "Lagos Runners".to_string(),
                "Lagos Chess Club".to_string(),
                "Greater Lagos Society".to_string(),
            ]
        );
    }
}
