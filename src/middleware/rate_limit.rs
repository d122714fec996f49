use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{
    config::Config,
    utils::{client_ip, error_codes, error_to_api_response},
};

/// 限流计数器的存储后端。生产环境用Redis，
/// 测试和单机部署可以用进程内计数器。
pub enum CounterStore {
    Redis(Arc<redis::Client>),
    Memory(Mutex<HashMap<String, (u32, Instant)>>),
}

impl CounterStore {
    pub fn redis(client: Arc<redis::Client>) -> Self {
        CounterStore::Redis(client)
    }

    pub fn memory() -> Self {
        CounterStore::Memory(Mutex::new(HashMap::new()))
    }

    /// 计数加一并返回窗口内的当前值，首次计数时设置过期
    pub async fn increment(&self, key: &str, window: Duration) -> Result<u32, redis::RedisError> {
        match self {
            CounterStore::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let count: u32 = conn.incr(key, 1).await?;
                if count == 1 {
                    let _: () = conn.expire(key, window.as_secs() as i64).await?;
                }
                Ok(count)
            }
            CounterStore::Memory(map) => {
                let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
                let now = Instant::now();
                let entry = map.entry(key.to_string()).or_insert((0, now + window));
                // 窗口到期后重新计数
                if now >= entry.1 {
                    *entry = (0, now + window);
                }
                entry.0 += 1;
                Ok(entry.0)
            }
        }
    }
}

pub struct RateLimiter {
    store: CounterStore,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(store: CounterStore, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, StatusCode> {
        // 从连接信息获取原始IP，优先使用反向代理头
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip());
        let ip = client_ip(req.headers(), remote_ip)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let key = format!("rate_limit:{}", ip);
        let window = self.config.rate_limit_window();
        let count = match self.store.increment(&key, window).await {
            Ok(count) => count,
            Err(e) => {
                // 计数失败时放行，限流不能成为单点故障
                tracing::warn!("rate limit counter unavailable, allowing request: {}", e);
                return Ok(next.run(req).await);
            }
        };

        if count > self.config.rate_limit_requests {
            return Ok((
                StatusCode::OK,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!(
                        "Too many requests, retry in {} seconds",
                        window.as_secs()
                    ),
                ),
            )
                .into_response());
        }

        Ok(next.run(req).await)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_counter_increments_within_window() {
        let store = CounterStore::memory();
        let window = Duration::from_secs(60);
        assert_eq!(store.increment("rate_limit:a", window).await.unwrap(), 1);
        assert_eq!(store.increment("rate_limit:a", window).await.unwrap(), 2);
        // 不同的键互不影响
        assert_eq!(store.increment("rate_limit:b", window).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_counter_resets_after_window() {
        let store = CounterStore::memory();
        let window = Duration::from_millis(50);
        assert_eq!(store.increment("rate_limit:a", window).await.unwrap(), 1);
        assert_eq!(store.increment("rate_limit:a", window).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.increment("rate_limit:a", window).await.unwrap(), 1);
    }
}
