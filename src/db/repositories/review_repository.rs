use async_trait::async_trait;
use log::debug;

use super::PgRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Review, ReviewInput};

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create_review(&self, book_id: i64, user_id: i64, input: ReviewInput) -> AppResult<Review>;
    async fn list_reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>>;
    /// Deletes the review only if it belongs to `user_id`. Returns whether a row was removed.
    async fn delete_review(&self, id: i64, user_id: i64) -> AppResult<bool>;
}

#[async_trait]
impl ReviewRepository for PgRepository {
    async fn create_review(&self, book_id: i64, user_id: i64, input: ReviewInput) -> AppResult<Review> {
        debug!("User {} reviewing book {}", user_id, book_id);

        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (book_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, book_id, user_id, rating, comment
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(input.rating)
        .bind(&input.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to create review", e))
    }

    async fn list_reviews_for_book(&self, book_id: i64) -> AppResult<Vec<Review>> {
        sqlx::query_as::<_, Review>(
            "SELECT id, book_id, user_id, rating, comment FROM reviews WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to list reviews", e))
    }

    async fn delete_review(&self, id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_sqlx("Failed to delete review", e))?;

        Ok(result.rows_affected() > 0)
    }
}
