// 群组存储库
// 包含群组相关的数据库操作，读路径带Redis旁路缓存

use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Error as SqlxError, PgPool, Postgres, QueryBuilder};

use crate::database::models::group::{Group, NewGroup, status};
use crate::database::{GroupFilter, GroupStore};
use crate::utils::{calculate_distance_km, slug_candidates, slugify};

/// 群组详情缓存的过期时间（秒）
const SLUG_CACHE_EXPIRE: u64 = 600; // 10分钟
/// 搜索结果缓存的过期时间（秒）
const SEARCH_CACHE_EXPIRE: u64 = 120; // 2分钟

/// 文本搜索结果只在这些条件下缓存，避免缓存被长尾查询塞满
const TEXT_CACHE_MIN_QUERY_LEN: usize = 5;
const TEXT_CACHE_MAX_ROWS: usize = 50;

const SLUG_KEY_PREFIX: &str = "group:slug:";
const TEXT_KEY_PREFIX: &str = "group:text:";
const RADIUS_KEY_PREFIX: &str = "group:radius:";

/// 查询语句共用的列清单，顺序与Group字段一致
const GROUP_COLUMNS: &str = "id, slug, name, description, address, city, region, country, \
     phone, email, website, whatsapp, social_links, categories, tags, \
     lat, lng, status, rejection_reason, featured, verified, \
     total_views, total_clicks, created_at, updated_at";

/// 公开可见性条件，所有对外读路径都必须带上
const VISIBLE_WHERE: &str = "(status = 'approved' OR status IS NULL)";

fn slug_key(slug: &str) -> String {
    format!("{}{}", SLUG_KEY_PREFIX, slug)
}

fn text_key(text: &str) -> String {
    format!("{}{}", TEXT_KEY_PREFIX, text.to_lowercase())
}

fn radius_key(lat: f64, lng: f64, radius_km: f64, filter: &GroupFilter) -> String {
    // 坐标精确到小数点后两位，约1公里，让邻近请求命中同一个键
    let lat_rounded = (lat * 100.0).round() / 100.0;
    let lng_rounded = (lng * 100.0).round() / 100.0;
    format!(
        "{}{}:{}:{}:{}:{}:{}",
        RADIUS_KEY_PREFIX,
        lat_rounded,
        lng_rounded,
        radius_km,
        filter.text.as_deref().unwrap_or("-").to_lowercase(),
        filter.category.as_deref().unwrap_or("-").to_lowercase(),
        filter.location.as_deref().unwrap_or("-").to_lowercase(),
    )
}

/// 群组存储库，处理所有与群组相关的数据库操作
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
    redis: Arc<RedisClient>,
}

impl GroupRepository {
    /// 创建新的群组存储库实例
    pub fn new(pool: PgPool, redis: Arc<RedisClient>) -> Self {
        Self { pool, redis }
    }

    /// 读缓存。Redis故障时降级为未命中，不影响主流程
    async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("redis unavailable for cache read: {}", e);
                return None;
            }
        };
        let json: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("cache read failed for {}: {}", key, e);
                return None;
            }
        };
        json.and_then(|j| serde_json::from_str(&j).ok())
    }

    /// 写缓存，失败只记日志
    async fn cache_put<T: Serialize>(&self, key: &str, value: &T, expire_secs: u64) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("redis unavailable for cache write: {}", e);
                return;
            }
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, json, expire_secs).await {
            tracing::debug!("cache write failed for {}: {}", key, e);
        }
    }

    async fn cache_del(&self, key: &str) {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("redis unavailable for cache invalidation: {}", e);
                return;
            }
        };
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("cache invalidation failed for {}: {}", key, e);
        }
    }

    /// 在基础查询上叠加过滤条件
    fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &GroupFilter) {
        if let Some(name) = &filter.name_exact {
            qb.push(" AND LOWER(name) = LOWER(");
            qb.push_bind(name.clone());
            qb.push(")");
        }
        if let Some(text) = &filter.text {
            let pattern = format!("%{}%", text);
            qb.push(" AND (name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR description ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR array_to_string(categories, ' ') ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND ");
            qb.push_bind(category.clone());
            qb.push(" ILIKE ANY(categories)");
        }
        if let Some(location) = &filter.location {
            let pattern = format!("%{}%", location);
            qb.push(" AND (city ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR region ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR country ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    /// 文本查询是否值得走缓存
    fn text_cacheable(filter: &GroupFilter) -> Option<&str> {
        if filter.name_exact.is_some() || filter.category.is_some() || filter.location.is_some() {
            return None;
        }
        filter
            .text
            .as_deref()
            .filter(|t| t.len() >= TEXT_CACHE_MIN_QUERY_LEN)
    }

    /// slug是否已被占用。包含待审核和已拒绝的记录，
    /// 保证新提交不会抢占任何历史slug
    async fn slug_exists(&self, slug: &str) -> Result<bool, SqlxError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM groups WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
    }

    /// 创建群组，初始状态为pending。slug冲突时追加数字后缀
    pub async fn create_group(&self, submission: &NewGroup) -> Result<Group, SqlxError> {
        let base = {
            let s = slugify(&submission.name);
            if s.is_empty() { "group".to_string() } else { s }
        };

        let mut slug = None;
        for candidate in slug_candidates(&base).take(100) {
            if !self.slug_exists(&candidate).await? {
                slug = Some(candidate);
                break;
            }
        }
        let slug = slug.ok_or_else(|| {
            SqlxError::Protocol(format!("no free slug for base '{}'", base))
        })?;

        let sql = format!(
            "INSERT INTO groups (slug, name, description, address, city, region, country, \
             phone, email, website, whatsapp, social_links, categories, tags, lat, lng, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {}",
            GROUP_COLUMNS
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(&slug)
            .bind(&submission.name)
            .bind(&submission.description)
            .bind(&submission.address)
            .bind(&submission.city)
            .bind(&submission.region)
            .bind(&submission.country)
            .bind(&submission.phone)
            .bind(&submission.email)
            .bind(&submission.website)
            .bind(&submission.whatsapp)
            .bind(&submission.social_links)
            .bind(&submission.categories)
            .bind(&submission.tags)
            .bind(submission.lat)
            .bind(submission.lng)
            .bind(status::PENDING)
            .fetch_one(&self.pool)
            .await
    }

    /// 按审核状态查询群组（管理端）。查询approved时包含status为NULL的历史数据
    pub async fn find_by_status(&self, status_filter: Option<&str>) -> Result<Vec<Group>, SqlxError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM groups WHERE 1=1", GROUP_COLUMNS));
        match status_filter {
            Some(s) if s == status::APPROVED => {
                qb.push(" AND ");
                qb.push(VISIBLE_WHERE);
            }
            Some(s) => {
                qb.push(" AND status = ");
                qb.push_bind(s.to_string());
            }
            None => {}
        }
        qb.push(" ORDER BY created_at DESC, id ASC");
        qb.build_query_as::<Group>().fetch_all(&self.pool).await
    }

    /// 精选群组，新加入的排前面
    pub async fn find_featured(&self, limit: i64) -> Result<Vec<Group>, SqlxError> {
        let sql = format!(
            "SELECT {} FROM groups WHERE {} AND featured = TRUE \
             ORDER BY created_at DESC, id ASC LIMIT $1",
            GROUP_COLUMNS, VISIBLE_WHERE
        );
        sqlx::query_as::<_, Group>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    /// 通过审核
    pub async fn approve_group(&self, group_id: i32) -> Result<(), SqlxError> {
        let slug = sqlx::query_scalar::<_, String>(
            "UPDATE groups SET status = $2, rejection_reason = NULL, updated_at = NOW() \
             WHERE id = $1 RETURNING slug",
        )
        .bind(group_id)
        .bind(status::APPROVED)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        self.cache_del(&slug_key(&slug)).await;
        Ok(())
    }

    /// 拒绝提交并记录原因
    pub async fn reject_group(&self, group_id: i32, reason: Option<&str>) -> Result<(), SqlxError> {
        let slug = sqlx::query_scalar::<_, String>(
            "UPDATE groups SET status = $2, rejection_reason = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING slug",
        )
        .bind(group_id)
        .bind(status::REJECTED)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        self.cache_del(&slug_key(&slug)).await;
        Ok(())
    }

    /// 删除群组
    pub async fn delete_group(&self, group_id: i32) -> Result<(), SqlxError> {
        let slug = sqlx::query_scalar::<_, String>(
            "DELETE FROM groups WHERE id = $1 RETURNING slug",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        self.cache_del(&slug_key(&slug)).await;
        Ok(())
    }

    /// 切换精选标记，返回切换后的值
    pub async fn toggle_featured(&self, group_id: i32) -> Result<bool, SqlxError> {
        let row = sqlx::query_as::<_, (String, bool)>(
            "UPDATE groups SET featured = NOT featured, updated_at = NOW() \
             WHERE id = $1 RETURNING slug, featured",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SqlxError::RowNotFound)?;

        self.cache_del(&slug_key(&row.0)).await;
        Ok(row.1)
    }

    /// 浏览计数。计数失败不影响请求，只记日志
    pub async fn record_view(&self, slug: &str) {
        let result = sqlx::query(
            "UPDATE groups SET total_views = total_views + 1 WHERE slug = $1",
        )
        .bind(slug)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::warn!("failed to record view for {}: {}", slug, e);
        }
    }

    /// 点击计数（外链、电话等），同样不影响请求
    pub async fn record_click(&self, slug: &str) {
        let result = sqlx::query(
            "UPDATE groups SET total_clicks = total_clicks + 1 WHERE slug = $1",
        )
        .bind(slug)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::warn!("failed to record click for {}: {}", slug, e);
        }
    }
}

impl GroupStore for GroupRepository {
    async fn find_approved(&self, filter: &GroupFilter) -> Result<Vec<Group>, SqlxError> {
        let cache_key = Self::text_cacheable(filter).map(text_key);
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache_get::<Vec<Group>>(key).await {
                return Ok(cached);
            }
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM groups WHERE {}",
            GROUP_COLUMNS, VISIBLE_WHERE
        ));
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY name ASC, id ASC");
        let groups = qb.build_query_as::<Group>().fetch_all(&self.pool).await?;

        if let Some(key) = &cache_key {
            if groups.len() < TEXT_CACHE_MAX_ROWS {
                self.cache_put(key, &groups, SEARCH_CACHE_EXPIRE).await;
            }
        }
        Ok(groups)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, SqlxError> {
        let key = slug_key(slug);
        if let Some(cached) = self.cache_get::<Group>(&key).await {
            return Ok(Some(cached));
        }

        let sql = format!(
            "SELECT {} FROM groups WHERE {} AND slug = $1",
            GROUP_COLUMNS, VISIBLE_WHERE
        );
        let group = sqlx::query_as::<_, Group>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(group) = &group {
            self.cache_put(&key, group, SLUG_CACHE_EXPIRE).await;
        }
        Ok(group)
    }

    async fn find_within_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        filter: &GroupFilter,
    ) -> Result<Vec<(Group, f64)>, SqlxError> {
        let key = radius_key(lat, lng, radius_km, filter);
        if let Some(cached) = self.cache_get::<Vec<(Group, f64)>>(&key).await {
            return Ok(cached);
        }

        // 先用边界框在SQL里粗筛，再在内存中做精确的球面距离过滤
        let lat_range = radius_km / 111.0;
        let lng_range = radius_km / (111.0 * lat.to_radians().cos().abs().max(0.01));

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM groups WHERE {} AND lat IS NOT NULL AND lng IS NOT NULL",
            GROUP_COLUMNS, VISIBLE_WHERE
        ));
        qb.push(" AND lat BETWEEN ");
        qb.push_bind(lat - lat_range);
        qb.push(" AND ");
        qb.push_bind(lat + lat_range);
        qb.push(" AND lng BETWEEN ");
        qb.push_bind(lng - lng_range);
        qb.push(" AND ");
        qb.push_bind(lng + lng_range);
        Self::push_filter(&mut qb, filter);

        let candidates = qb.build_query_as::<Group>().fetch_all(&self.pool).await?;

        let nearby: Vec<(Group, f64)> = candidates
            .into_iter()
            .filter_map(|group| {
                let (group_lat, group_lng) = group.coordinates()?;
                let distance = calculate_distance_km(lat, lng, group_lat, group_lng);
                (distance <= radius_km).then_some((group, distance))
            })
            .collect();

        if nearby.len() < TEXT_CACHE_MAX_ROWS {
            self.cache_put(&key, &nearby, SEARCH_CACHE_EXPIRE).await;
        }
        Ok(nearby)
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, SqlxError> {
        let sql = format!(
            "SELECT DISTINCT unnest(categories) AS category FROM groups WHERE {} ORDER BY category ASC",
            VISIBLE_WHERE
        );
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn name_suggestions(&self, prefix: &str, limit: i64) -> Result<Vec<String>, SqlxError> {
        let sql = format!(
            "SELECT name FROM groups WHERE {} AND name ILIKE $1 ORDER BY name ASC LIMIT $2",
            VISIBLE_WHERE
        );
        sqlx::query_scalar::<_, String>(&sql)
            .bind(format!("%{}%", prefix))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}
