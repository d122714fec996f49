use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;

pub mod config;
pub mod database;
pub mod geo;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod utils;

use database::GroupRepository;
use geo::IpGeoClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub redis: Arc<RedisClient>,
    pub repo: GroupRepository,
    pub geo: Arc<IpGeoClient>,
}
