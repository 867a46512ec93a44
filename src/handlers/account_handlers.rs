use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{AuthenticatedUser, UserChanges};
use crate::services::AccountService;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn register(
    service: web::Data<AccountService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let user = service.register(&body.email, &body.password, &body.name).await?;
    Ok(HttpResponse::Created().json(user))
}

pub async fn login(
    service: web::Data<AccountService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let token = service.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// Profile of the authenticated caller. Serves both `/me` and `/profile`.
pub async fn get_profile(
    user: AuthenticatedUser,
    service: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let profile = service.get_profile(user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_profile(
    user: AuthenticatedUser,
    service: web::Data<AccountService>,
    body: web::Json<UserChanges>,
) -> Result<HttpResponse, AppError> {
    let profile = service.update_profile(user.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}
