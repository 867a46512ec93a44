use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PgRepository;
use super::book_repository::BookRow;
use crate::error::{AppError, AppResult};
use crate::models::{Book, ShelfEntry};

#[async_trait]
pub trait ShelfRepository: Send + Sync {
    /// Inserts or updates the status of `book_id` on the user's shelf.
    async fn upsert_shelf_entry(&self, user_id: i64, book_id: i64, status: &str) -> AppResult<()>;
    async fn list_shelf(&self, user_id: i64) -> AppResult<Vec<ShelfEntry>>;
    async fn remove_shelf_entry(&self, user_id: i64, book_id: i64) -> AppResult<bool>;
}

#[derive(Debug, sqlx::FromRow)]
struct ShelfRow {
    user_id: i64,
    status: String,
    updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    book: BookRow,
}

impl From<ShelfRow> for ShelfEntry {
    fn from(row: ShelfRow) -> Self {
        let book = Book::from(row.book);
        ShelfEntry {
            user_id: row.user_id,
            book_id: book.id,
            status: row.status,
            updated_at: row.updated_at,
            book,
        }
    }
}

#[async_trait]
impl ShelfRepository for PgRepository {
    async fn upsert_shelf_entry(&self, user_id: i64, book_id: i64, status: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shelves (user_id, book_id, status, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id, book_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to update shelf", e))?;

        Ok(())
    }

    async fn list_shelf(&self, user_id: i64) -> AppResult<Vec<ShelfEntry>> {
        let rows = sqlx::query_as::<_, ShelfRow>(
            r#"
            SELECT s.user_id, s.status, s.updated_at,
                   b.id, b.title, b.description, b.content, b.author_id,
                   a.name AS author_name, a.bio AS author_bio
            FROM shelves s
            JOIN books b ON b.id = s.book_id
            LEFT JOIN authors a ON a.id = b.author_id
            WHERE s.user_id = $1
            ORDER BY s.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to list shelf", e))?;

        Ok(rows.into_iter().map(ShelfEntry::from).collect())
    }

    async fn remove_shelf_entry(&self, user_id: i64, book_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM shelves WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to remove shelf entry", e))?;

        Ok(result.rows_affected() > 0)
    }
}
