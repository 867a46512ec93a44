use actix_web::web;

use crate::handlers::{
    self, account_handlers, author_handlers, book_handlers, review_handlers, shelf_handlers,
};
use crate::middleware::TokenAuthentication;

/// Registers public routes and the `/api/v1` scope guarded by `auth`.
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth: TokenAuthentication) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
        .route("/health", web::get().to(handlers::health::health_check))
        .route("/register", web::post().to(account_handlers::register))
        .route("/login", web::post().to(account_handlers::login))
        .service(
            web::scope("/api/v1")
                .wrap(auth)
                .configure(configure_protected_routes),
        );
}

/// Routes that require a verified bearer token. Mounted under `/api/v1`.
pub fn configure_protected_routes(cfg: &mut web::ServiceConfig) {
    // Profile
    cfg.service(
        web::resource("/me")
            .route(web::get().to(account_handlers::get_profile))
            .route(web::put().to(account_handlers::update_profile)),
    )
    .route("/profile", web::get().to(account_handlers::get_profile));

    // Books
    cfg.service(
        web::resource("/books")
            .route(web::get().to(book_handlers::list_books))
            .route(web::post().to(book_handlers::create_book)),
    )
    .service(
        web::resource("/books/{id}")
            .route(web::get().to(book_handlers::get_book))
            .route(web::put().to(book_handlers::update_book))
            .route(web::delete().to(book_handlers::delete_book)),
    )
    .route("/books/{id}/content", web::get().to(book_handlers::get_book_content));

    // Authors
    cfg.service(
        web::resource("/authors")
            .route(web::get().to(author_handlers::list_authors))
            .route(web::post().to(author_handlers::create_author)),
    )
    .service(
        web::resource("/authors/{id}")
            .route(web::get().to(author_handlers::get_author))
            .route(web::put().to(author_handlers::update_author))
            .route(web::delete().to(author_handlers::delete_author)),
    )
    .route("/authors/{id}/books", web::get().to(author_handlers::list_author_books));

    // Reviews
    cfg.service(
        web::resource("/books/{id}/reviews")
            .route(web::get().to(review_handlers::list_reviews))
            .route(web::post().to(review_handlers::add_review)),
    )
    .route("/reviews/{id}", web::delete().to(review_handlers::delete_review));

    // Shelf
    cfg.route("/shelf", web::get().to(shelf_handlers::get_shelf))
        .service(
            web::resource("/shelf/{id}")
                .route(web::post().to(shelf_handlers::set_shelf_status))
                .route(web::put().to(shelf_handlers::set_shelf_status))
                .route(web::delete().to(shelf_handlers::remove_from_shelf)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::db::Repository;
    use crate::error::ErrorResponse;
    use crate::handlers::account_handlers::TokenResponse;
    use crate::middleware::RateLimitMiddleware;
    use crate::models::{Book, Review, ShelfEntry, User};
    use crate::services::auth::JwtKeys;
    use crate::services::{AccountService, LibraryService};
    use crate::test_utils::{FailingCounterStore, InMemoryRepository, MemoryCounterStore};
    use actix_web::http::{Method, StatusCode, header::AUTHORIZATION};
    use actix_web::{App, test};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    const SECRET: &str = "routes-secret";

    fn keys() -> Arc<JwtKeys> {
        Arc::new(JwtKeys::from_secret(SECRET, 1))
    }

    fn services() -> (AccountService, LibraryService) {
        let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        (
            AccountService::new(repository.clone(), keys()),
            LibraryService::new(repository),
        )
    }

    macro_rules! catalog_app {
        ($store:expr, $account:expr, $library:expr) => {
            test::init_service(
                App::new()
                    .wrap(RateLimitMiddleware::with_store(
                        $store,
                        &RateLimitConfig::default(),
                    ))
                    .app_data(web::Data::new($account.clone()))
                    .app_data(web::Data::new($library.clone()))
                    .configure(|cfg| configure_routes(cfg, TokenAuthentication::new(keys()))),
            )
            .await
        };
    }

    async fn signed_in(account: &AccountService, email: &str) -> (User, String) {
        let user = account.register(email, "pw", "Reader").await.unwrap();
        let token = account.login(email, "pw").await.unwrap();
        (user, token)
    }

    fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_health_is_public() {
        let (account, library) = services();
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_register_login_then_profile_sees_token_identity() {
        let (account, library) = services();
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"email": "reader@example.com", "password": "pw", "name": "Reader"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user: User = test::read_body_json(resp).await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "reader@example.com", "password": "pw"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let TokenResponse { token } = test::read_body_json(resp).await;

        for uri in ["/api/v1/me", "/api/v1/profile"] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let profile: User = test::read_body_json(resp).await;
            assert_eq!(profile.id, user.id);
            assert_eq!(profile.email, "reader@example.com");
        }
    }

    #[actix_web::test]
    async fn test_wrong_password_is_unauthorized() {
        let (account, library) = services();
        signed_in(&account, "reader@example.com").await;
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "reader@example.com", "password": "nope"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "invalid credentials");
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let (account, library) = services();
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        for (method, uri) in [
            (Method::GET, "/api/v1/me"),
            (Method::GET, "/api/v1/books"),
            (Method::POST, "/api/v1/authors"),
            (Method::DELETE, "/api/v1/reviews/1"),
            (Method::GET, "/api/v1/shelf"),
        ] {
            let req = test::TestRequest::default()
                .method(method)
                .uri(uri)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
            let body: ErrorResponse = test::read_body_json(resp).await;
            assert_eq!(body.error, "Missing authorization header");
        }
    }

    #[actix_web::test]
    async fn test_invalid_path_id() {
        let (account, library) = services();
        let (_, token) = signed_in(&account, "reader@example.com").await;
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        for uri in ["/api/v1/books/abc", "/api/v1/books/-3", "/api/v1/authors/x/books"] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: ErrorResponse = test::read_body_json(resp).await;
            assert_eq!(body.error, "Invalid ID format");
        }
    }

    #[actix_web::test]
    async fn test_review_and_shelf_use_caller_identity() {
        let (account, library) = services();
        let (user, token) = signed_in(&account, "reader@example.com").await;
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::post()
            .uri("/api/v1/books")
            .insert_header(bearer(&token))
            .set_json(json!({"title": "Kindred", "content": "..."}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let book: Book = test::read_body_json(resp).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/books/{}/reviews", book.id))
            .insert_header(bearer(&token))
            .set_json(json!({"rating": 4, "comment": "good", "user_id": 999}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let review: Review = test::read_body_json(resp).await;
        assert_eq!(review.user_id, user.id);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/shelf/{}", book.id))
            .insert_header(bearer(&token))
            .set_json(json!({"status": "reading"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/shelf")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let shelf: Vec<ShelfEntry> = test::read_body_json(resp).await;
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].user_id, user.id);
        assert_eq!(shelf[0].status, "reading");
    }

    #[actix_web::test]
    async fn test_missing_book_is_not_found() {
        let (account, library) = services();
        let (_, token) = signed_in(&account, "reader@example.com").await;
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::get()
            .uri("/api/v1/books/12345/content")
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Book not found");
    }

    #[actix_web::test]
    async fn test_rate_limit_applies_to_public_and_protected_routes() {
        let (account, library) = services();
        let store = Arc::new(MemoryCounterStore::new());
        let app = catalog_app!(store.clone(), account, library);

        for _ in 0..100 {
            let req = test::TestRequest::get()
                .uri("/health")
                .insert_header(("x-forwarded-for", "198.51.100.20"))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        // Rejected before the authenticator runs
        let req = test::TestRequest::get()
            .uri("/api/v1/me")
            .insert_header(("x-forwarded-for", "198.51.100.20"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(store.count("rate_limit:198.51.100.20"), Some(101));
    }

    #[actix_web::test]
    async fn test_store_outage_blocks_public_routes() {
        let (account, library) = services();
        let app = catalog_app!(Arc::new(FailingCounterStore), account, library);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Redis error");
    }

    #[actix_web::test]
    async fn test_malformed_json_uses_error_shape() {
        let (account, library) = services();
        let app = catalog_app!(Arc::new(MemoryCounterStore::new()), account, library);

        let req = test::TestRequest::post()
            .uri("/login")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Invalid request body"));
    }
}
