use actix_web::{HttpResponse, web};

use super::parse_id;
use crate::error::AppError;
use crate::models::AuthorInput;
use crate::services::LibraryService;

pub async fn list_authors(service: web::Data<LibraryService>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service.list_authors().await?))
}

pub async fn create_author(
    service: web::Data<LibraryService>,
    body: web::Json<AuthorInput>,
) -> Result<HttpResponse, AppError> {
    let author = service.create_author(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(author))
}

pub async fn get_author(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(service.get_author(id).await?))
}

pub async fn update_author(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
    body: web::Json<AuthorInput>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    let author = service.update_author(id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(author))
}

pub async fn delete_author(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    service.delete_author(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_author_books(
    service: web::Data<LibraryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path)?;
    Ok(HttpResponse::Ok().json(service.list_books_by_author(id).await?))
}
