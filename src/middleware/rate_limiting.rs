use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
};
use async_trait::async_trait;
use futures_util::future::{Ready, ok};
use log::{debug, error, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Prefix of every rate-limit counter key.
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit";

pub const RATE_LIMIT_EXCEEDED_MESSAGE: &str = "Rate limit exceeded. Try again in a minute.";

#[derive(Debug, thiserror::Error)]
pub enum CounterStoreError {
    #[error("counter store error: {0}")]
    Backend(String),
    #[error("counter store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for CounterStoreError {
    fn from(error: redis::RedisError) -> Self {
        CounterStoreError::Backend(error.to_string())
    }
}

/// Shared, atomically incrementing counter service backing the rate limiter.
///
/// Implementations must make `incr_in_window` atomic across every server
/// instance: each concurrent caller observes a distinct value, and the
/// increment and the TTL it arms land together or not at all.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments `key` and returns the new value. A key without a TTL (fresh,
    /// or left behind by an interrupted writer) gets `window`; an existing TTL
    /// is never refreshed.
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, CounterStoreError>;
}

// KEYS[1] = counter key, ARGV[1] = window in seconds.
// TTL returns -1 when the key exists without an expiry.
const INCR_IN_WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) == -1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Redis-based counter store (distributed)
#[derive(Clone)]
pub struct RedisCounterStore {
    connection_manager: redis::aio::ConnectionManager,
    incr_script: redis::Script,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        info!("Redis connection established for rate limiting");

        Ok(Self {
            connection_manager,
            incr_script: redis::Script::new(INCR_IN_WINDOW_SCRIPT),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, CounterStoreError> {
        let mut conn = self.connection_manager.clone();
        let count: i64 = self
            .incr_script
            .key(key)
            .arg(window.as_secs().max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { count: i64 },
    Limited { count: i64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Fixed-window counter keyed by client identity.
///
/// The window starts on the increment that creates the key (value 1), which
/// arms the TTL. Later increments never refresh it.
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
    store_timeout: Duration,
}

impl FixedWindowRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window(),
            store_timeout: config.store_timeout(),
        }
    }

    pub fn key_for(identity: &str) -> String {
        format!("{}:{}", RATE_LIMIT_KEY_PREFIX, identity)
    }

    pub async fn check(&self, identity: &str) -> Result<RateLimitDecision, CounterStoreError> {
        let key = Self::key_for(identity);

        let count = tokio::time::timeout(self.store_timeout, self.store.incr_in_window(&key, self.window))
            .await
            .map_err(|_| CounterStoreError::Timeout(self.store_timeout))??;

        if count > self.max_requests as i64 {
            Ok(RateLimitDecision::Limited { count })
        } else {
            Ok(RateLimitDecision::Allowed { count })
        }
    }
}

// Extracts the client IP address. With `trust_forwarded` the first IP in
// X-Forwarded-For (then X-Real-IP) wins; those headers are client-controlled
// unless the immediate upstream proxy overwrites them, so a direct client
// could rotate them to dodge the limit. Without it only the peer address counts.
pub fn extract_client_ip(req: &ServiceRequest, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_client_ip(req) {
            return ip;
        }
    }

    // Fallback to connection info
    if let Some(peer_addr) = req.peer_addr() {
        peer_addr.ip().to_string()
    } else {
        "unknown".to_string()
    }
}

fn forwarded_client_ip(req: &ServiceRequest) -> Option<String> {
    if let Some(forwarded_for) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            let real_ip_str = real_ip_str.trim();
            if !real_ip_str.is_empty() {
                return Some(real_ip_str.to_string());
            }
        }
    }

    None
}

/// Rate limiting middleware, applied to every route before routing.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<FixedWindowRateLimiter>,
    trust_forwarded_headers: bool,
}

impl RateLimitMiddleware {
    pub fn new(limiter: FixedWindowRateLimiter, trust_forwarded_headers: bool) -> Self {
        Self {
            limiter: Arc::new(limiter),
            trust_forwarded_headers,
        }
    }

    pub fn with_store(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self::new(
            FixedWindowRateLimiter::new(store, config),
            config.trust_forwarded_headers,
        )
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService {
            service: Arc::new(service),
            limiter: self.limiter.clone(),
            trust_forwarded_headers: self.trust_forwarded_headers,
        })
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    service: Arc<S>,
    limiter: Arc<FixedWindowRateLimiter>,
    trust_forwarded_headers: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();
        let trust_forwarded_headers = self.trust_forwarded_headers;

        Box::pin(async move {
            let request_path = req.path().to_string();
            let client_ip = extract_client_ip(&req, trust_forwarded_headers);

            let rejection = match limiter.check(&client_ip).await {
                Ok(RateLimitDecision::Allowed { count }) => {
                    debug!(
                        "Rate limit passed for {} from IP: {} (count: {})",
                        request_path, client_ip, count
                    );
                    return service.call(req).await.map(ServiceResponse::map_into_left_body);
                }
                Ok(RateLimitDecision::Limited { count }) => {
                    warn!(
                        "Rate limit exceeded for {} from IP: {} (count: {})",
                        request_path, client_ip, count
                    );
                    AppError::TooManyRequests(RATE_LIMIT_EXCEEDED_MESSAGE.to_string())
                }
                Err(e) => {
                    error!(
                        "Rate limit check failed for IP {}: {}. Denying request (fail closed).",
                        client_ip, e
                    );
                    AppError::StoreUnavailable
                }
            };

            let response = rejection.error_response();
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}

/// Connects the shared counter store used by every server instance.
pub async fn create_rate_limit_storage(redis_url: &str) -> Result<RedisCounterStore, String> {
    match RedisCounterStore::connect(redis_url).await {
        Ok(store) => {
            info!("Redis connected for rate limiting");
            Ok(store)
        }
        Err(e) => {
            error!("Failed to connect to Redis for rate limiting: {}", e);
            Err(format!(
                "Failed to connect to Redis: {}. Redis is required for rate limiting.",
                e
            ))
        }
    }
}
