use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use naija_directory::{
    AppState,
    config::Config,
    database::GroupRepository,
    geo::IpGeoClient,
    middleware::{CounterStore, RateLimiter, admin_auth, log_errors, rate_limit},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'naija_directory';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis = Arc::new(redis_client);

    // 设置应用状态
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        redis: redis.clone(),
        repo: GroupRepository::new(pool, redis.clone()),
        geo: Arc::new(IpGeoClient::new(&config.ip_geo_endpoint)),
    };

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(
        CounterStore::redis(redis),
        config.clone(),
    ));

    // 公开路由
    let public_routes = Router::new()
        .route("/ping", get(routes::ping))
        // 搜索路由
        .route("/search", get(routes::search::handler::search_groups))
        .route(
            "/search/suggestions",
            get(routes::search::handler::search_suggestions),
        )
        // 群组路由
        .route(
            "/groups",
            get(routes::group::handler::list_groups).post(routes::group::handler::submit_group),
        )
        .route("/groups/featured", get(routes::group::handler::featured_groups))
        .route(
            "/groups/categories",
            get(routes::group::handler::group_categories),
        )
        .route("/groups/by-slug", get(routes::group::handler::get_by_slug))
        .route("/groups/click", post(routes::group::handler::record_click));

    // 管理路由，需要x-admin-token
    let admin_routes = Router::new()
        .route("/admin/groups", get(routes::admin::handler::list_groups))
        .route(
            "/admin/groups/approve",
            post(routes::admin::handler::approve_group),
        )
        .route(
            "/admin/groups/reject",
            post(routes::admin::handler::reject_group),
        )
        .route(
            "/admin/groups/delete",
            post(routes::admin::handler::delete_group),
        )
        .route(
            "/admin/groups/toggle-featured",
            post(routes::admin::handler::toggle_featured),
        )
        .layer(axum::middleware::from_fn_with_state(
            config.clone(),
            admin_auth,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(admin_routes),
    );

    // 添加日志中间件和限流中间件
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
