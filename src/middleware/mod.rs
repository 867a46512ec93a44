pub mod rate_limiting;
pub mod token_auth;

pub use rate_limiting::{
    CounterStore, FixedWindowRateLimiter, RateLimitMiddleware, RedisCounterStore,
    create_rate_limit_storage,
};
pub use token_auth::TokenAuthentication;
