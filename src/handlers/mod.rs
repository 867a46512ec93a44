pub mod account_handlers;
pub mod author_handlers;
pub mod book_handlers;
pub mod health;
pub mod review_handlers;
pub mod shelf_handlers;

use actix_web::{HttpRequest, error::JsonPayloadError};

use crate::error::{AppError, AppResult};

pub const INVALID_ID_MESSAGE: &str = "Invalid ID format";

/// Parses a path id. Anything but a non-negative integer is a 400.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| AppError::BadRequest(INVALID_ID_MESSAGE.to_string()))
}

/// Renders body deserialization failures with the common error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid request body: {}", err)).into()
}
