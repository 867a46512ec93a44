use actix_web::{HttpResponse, web};

use super::parse_id;
use crate::error::AppError;
use crate::models::{AuthenticatedUser, ReviewInput};
use crate::services::LibraryService;

pub async fn list_reviews(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let book_id = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(service.list_reviews(book_id).await?))
}

/// The review is attributed to the authenticated caller, never to a body field.
pub async fn add_review(
    user: AuthenticatedUser,
    service: web::Data<LibraryService>,
    path: web::Path<String>,
    body: web::Json<ReviewInput>,
) -> Result<HttpResponse, AppError> {
    let book_id = parse_id(&path)?;
    let review = service
        .add_review(book_id, user.user_id, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(review))
}

pub async fn delete_review(
    user: AuthenticatedUser,
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    service.delete_review(id, user.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
