pub mod author_repository;
pub mod book_repository;
pub mod review_repository;
pub mod shelf_repository;
pub mod user_repository;

pub use author_repository::AuthorRepository;
pub use book_repository::BookRepository;
pub use review_repository::ReviewRepository;
pub use shelf_repository::ShelfRepository;
pub use user_repository::UserRepository;

use sqlx::PgPool;

/// Everything the services need from persistence.
pub trait Repository:
    UserRepository + BookRepository + AuthorRepository + ReviewRepository + ShelfRepository
{
}

impl<T> Repository for T where
    T: UserRepository + BookRepository + AuthorRepository + ReviewRepository + ShelfRepository
{
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
