use async_trait::async_trait;
use log::debug;

use super::PgRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Author, AuthorInput};

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn create_author(&self, input: AuthorInput) -> AppResult<Author>;
    async fn list_authors(&self) -> AppResult<Vec<Author>>;
    async fn get_author(&self, id: i64) -> AppResult<Option<Author>>;
    async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Option<Author>>;
    /// Removes the author. Their books remain with `author_id` cleared.
    async fn delete_author(&self, id: i64) -> AppResult<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    name: String,
    bio: String,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: row.id,
            name: row.name,
            bio: row.bio,
            books: Vec::new(),
        }
    }
}

#[async_trait]
impl AuthorRepository for PgRepository {
    async fn create_author(&self, input: AuthorInput) -> AppResult<Author> {
        debug!("Creating author '{}'", input.name);

        let row = sqlx::query_as::<_, AuthorRow>(
            "INSERT INTO authors (name, bio) VALUES ($1, $2) RETURNING id, name, bio",
        )
        .bind(&input.name)
        .bind(&input.bio)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to create author", e))?;

        Ok(row.into())
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let rows = sqlx::query_as::<_, AuthorRow>("SELECT id, name, bio FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to list authors", e))?;

        Ok(rows.into_iter().map(Author::from).collect())
    }

    async fn get_author(&self, id: i64) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>("SELECT id, name, bio FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to fetch author", e))?;

        Ok(row.map(Author::from))
    }

    async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Option<Author>> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "UPDATE authors SET name = $1, bio = $2 WHERE id = $3 RETURNING id, name, bio",
        )
        .bind(&input.name)
        .bind(&input.bio)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to update author", e))?;

        Ok(row.map(Author::from))
    }

    async fn delete_author(&self, id: i64) -> AppResult<bool> {
        // books.author_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to delete author", e))?;

        debug!("Deleted {} author row(s) for id {}", result.rows_affected(), id);
        Ok(result.rows_affected() > 0)
    }
}
