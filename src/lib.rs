//! E-book catalog service library
//!
//! Exposes the modules used by the server binary: the request admission
//! layer (rate limiting and bearer-token authentication) and the catalog
//! services behind it.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types for convenience
pub use config::AppSettings;
pub use error::AppError;
