pub mod account_service;
pub mod auth;
pub mod library_service;

pub use account_service::AccountService;
pub use library_service::LibraryService;
