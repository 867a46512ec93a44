use actix_web::{HttpResponse, web};

use super::parse_id;
use crate::error::AppError;
use crate::models::{AuthenticatedUser, ShelfStatusInput};
use crate::services::LibraryService;

pub async fn get_shelf(
    user: AuthenticatedUser,
    service: web::Data<LibraryService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service.get_shelf(user.user_id).await?))
}

/// Serves both adding a book to the shelf and changing its status.
pub async fn set_shelf_status(
    user: AuthenticatedUser,
    service: web::Data<LibraryService>,
    path: web::Path<String>,
    body: web::Json<ShelfStatusInput>,
) -> Result<HttpResponse, AppError> {
    let book_id = parse_id(&path)?;
    service
        .set_shelf_status(user.user_id, book_id, &body.status)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn remove_from_shelf(
    user: AuthenticatedUser,
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let book_id = parse_id(&path)?;
    service.remove_from_shelf(user.user_id, book_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
