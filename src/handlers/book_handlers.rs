use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::error::AppError;
use crate::models::BookInput;
use crate::services::LibraryService;

#[derive(Debug, Serialize, Deserialize)]
pub struct BookContentResponse {
    pub content: String,
}

pub async fn list_books(service: web::Data<LibraryService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service.list_books().await?))
}

pub async fn create_book(
    service: web::Data<LibraryService>,
    body: web::Json<BookInput>,
) -> Result<HttpResponse, AppError> {
    let book = service.create_book(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(book))
}

pub async fn get_book(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(service.get_book(id).await?))
}

pub async fn update_book(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
    body: web::Json<BookInput>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let book = service.update_book(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(book))
}

pub async fn delete_book(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    service.delete_book(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_book_content(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let content = service.get_book_content(id).await?;
    Ok(HttpResponse::Ok().json(BookContentResponse { content }))
}
