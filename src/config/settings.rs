use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub token_duration_hours: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
    pub store_timeout_ms: u64,
    /// Identify clients by `X-Forwarded-For`/`X-Real-IP`. Only safe behind a
    /// proxy that overwrites those headers; otherwise clients pick their own key.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            store_timeout_ms: 2000,
            trust_forwarded_headers: true,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        // App config
        let app_name = var("APP_NAME").unwrap_or_else(|| "ebook-service".to_string());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        // Database config
        let database_url = match var("DATABASE_URL").or_else(|| var("DB_DSN")) {
            Some(url) => url,
            None => {
                let host = var("DB_HOST").ok_or_else(|| {
                    AppError::Configuration("DATABASE_URL or DB_HOST must be set".to_string())
                })?;
                let port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());
                let user = var("DB_USER").unwrap_or_else(|| "postgres".to_string());
                let password = var("DB_PASSWORD").unwrap_or_default();
                let name = var("DB_NAME").unwrap_or_else(|| "ebooks".to_string());
                let sslmode = var("DB_SSLMODE").unwrap_or_else(|| "disable".to_string());
                format!(
                    "postgres://{}:{}@{}:{}/{}?sslmode={}",
                    urlencoding::encode(&user),
                    urlencoding::encode(&password),
                    host,
                    port,
                    name,
                    sslmode
                )
            }
        };

        let max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", 10u32)?;

        // Redis config
        let redis_url = match var("REDIS_URL") {
            Some(url) => url,
            None => var("REDIS_ADDR")
                .map(|addr| format!("redis://{}", addr))
                .ok_or_else(|| {
                    AppError::Configuration("REDIS_URL or REDIS_ADDR must be set".to_string())
                })?,
        };

        // Server config
        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = match var("SERVER_PORT") {
            Some(port) => port,
            None => var("PORT")
                .map(|port| port.trim_start_matches(':').to_string())
                .unwrap_or_else(|| "8080".to_string()),
        }
        .parse::<u16>()
        .map_err(|_| {
            AppError::Configuration("SERVER_PORT must be a valid port number".to_string())
        })?;

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Auth config
        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| AppError::Configuration("JWT_SECRET must be set".to_string()))?;
        let token_duration_hours = parse_or(&var, "JWT_TOKEN_DURATION_HOURS", 72i64)?;
        if token_duration_hours <= 0 {
            return Err(AppError::Configuration(
                "JWT_TOKEN_DURATION_HOURS must be positive".to_string(),
            ));
        }

        // Rate limiting
        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&var, "RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
            window_secs: parse_or(&var, "RATE_LIMIT_WINDOW_SECS", defaults.window_secs)?,
            store_timeout_ms: parse_or(
                &var,
                "RATE_LIMIT_STORE_TIMEOUT_MS",
                defaults.store_timeout_ms,
            )?,
            trust_forwarded_headers: parse_or(
                &var,
                "RATE_LIMIT_TRUST_FORWARDED_HEADERS",
                defaults.trust_forwarded_headers,
            )?,
        };
        if rate_limit.window_secs == 0 {
            return Err(AppError::Configuration(
                "RATE_LIMIT_WINDOW_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            redis: RedisConfig { url: redis_url },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            auth: AuthConfig {
                jwt_secret,
                token_duration_hours,
            },
            rate_limit,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Configuration(format!("{} has an invalid value", key))),
        None => Ok(default),
    }
}
