use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

use ebook_service::config;
use ebook_service::db::{PgRepository, Repository, create_pool, run_migrations, verify_connection};
use ebook_service::middleware::{RateLimitMiddleware, TokenAuthentication, create_rate_limit_storage};
use ebook_service::routes::configure_routes;
use ebook_service::services::auth::JwtKeys;
use ebook_service::services::{AccountService, LibraryService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_settings = match config::init_config() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    let db_pool = match create_pool(&app_settings.database).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                std::process::exit(1);
            }
            if let Err(e) = run_migrations(&pool).await {
                log::error!("{}", e);
                std::process::exit(1);
            }
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    // The rate limiter fails closed, so the server refuses to start without its store
    let counter_store = match create_rate_limit_storage(&app_settings.redis.url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let jwt_keys = Arc::new(JwtKeys::from_secret(
        &app_settings.auth.jwt_secret,
        app_settings.auth.token_duration_hours,
    ));
    log::info!("JWT keys initialized successfully");

    let repository: Arc<dyn Repository> = Arc::new(PgRepository::new(db_pool));
    let account_service = web::Data::new(AccountService::new(repository.clone(), jwt_keys.clone()));
    let library_service = web::Data::new(LibraryService::new(repository));
    let rate_limiter = RateLimitMiddleware::with_store(counter_store, &app_settings.rate_limit);
    let token_auth = TokenAuthentication::new(jwt_keys);

    let host = &app_settings.server.host;
    let port = app_settings.server.port;
    log::info!(
        "Starting {} ({}) at http://{}:{}",
        app_settings.app.name,
        app_settings.app.environment,
        host,
        port
    );

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;
    let cors_origins = app_settings.server.cors_origins.clone();

    HttpServer::new(move || {
        let mut cors = Cors::default();
        if cors_origins.iter().any(|origin| origin == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        let token_auth = token_auth.clone();

        // Last wrap runs first: logging, CORS, then rate limiting ahead of routing
        App::new()
            .wrap(rate_limiter.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(account_service.clone())
            .app_data(library_service.clone())
            .configure(move |cfg| configure_routes(cfg, token_auth))
    })
    .listen(listener)?
    .run()
    .await
}
