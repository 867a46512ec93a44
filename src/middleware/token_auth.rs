use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
};
use futures_util::future::{Ready, ok};
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::services::auth::JwtKeys;

pub const MISSING_HEADER_MESSAGE: &str = "Missing authorization header";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid authorization format";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

const BEARER_SCHEME: &str = "Bearer";

/// Splits an `Authorization` value of the exact form `Bearer <token>`.
pub fn parse_bearer(header_value: &str) -> Result<&str, AppError> {
    let parts: Vec<&str> = header_value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if *scheme == BEARER_SCHEME => Ok(token),
        _ => Err(AppError::Unauthorized(INVALID_FORMAT_MESSAGE.to_string())),
    }
}

/// Resolves the caller identity from the request headers.
///
/// Every failure maps to one of three fixed 401 messages; the underlying
/// verification error only reaches the logs.
pub fn authenticate(req: &ServiceRequest, keys: &JwtKeys) -> Result<AuthenticatedUser, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized(MISSING_HEADER_MESSAGE.to_string()))?;

    let header_value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized(INVALID_FORMAT_MESSAGE.to_string()))?;
    let token = parse_bearer(header_value)?;

    let claims = keys.verify_token(token).map_err(|e| {
        debug!("Token rejected for {}: {}", req.path(), e);
        AppError::Unauthorized(INVALID_TOKEN_MESSAGE.to_string())
    })?;

    Ok(AuthenticatedUser::from(claims))
}

/// Bearer-token gate for protected route groups.
#[derive(Clone)]
pub struct TokenAuthentication {
    keys: Arc<JwtKeys>,
}

impl TokenAuthentication {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = TokenAuthenticationMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(TokenAuthenticationMiddleware {
            service: Arc::new(service),
            keys: self.keys.clone(),
        })
    }
}

pub struct TokenAuthenticationMiddleware<S> {
    service: Arc<S>,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for TokenAuthenticationMiddleware<S>
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
        let keys = self.keys.clone();

        Box::pin(async move {
            match authenticate(&req, &keys) {
                Ok(user) => {
                    debug!("Authenticated user {} for {}", user.user_id, req.path());
                    req.extensions_mut().insert(user);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(e) => {
                    warn!("Authentication failed for {}: {}", req.path(), e);
                    let response = e.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
