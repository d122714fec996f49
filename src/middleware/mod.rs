mod admin_auth;
mod error_handler;
mod rate_limit;

pub use admin_auth::admin_auth;
pub use error_handler::log_errors;
pub use rate_limit::{CounterStore, RateLimiter, rate_limit};
