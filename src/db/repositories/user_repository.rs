use async_trait::async_trait;
use log::debug;

use super::PgRepository;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserChanges, UserCredentials};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;
    async fn get_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    async fn get_user_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        debug!("Creating user {}", new_user.email);

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to create user", e))
    }

    async fn get_user_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to fetch user by email", e))
    }

    async fn get_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to fetch user", e))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                name = COALESCE($2, name),
                updated_at = now()
            WHERE id = $3
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(changes.email)
        .bind(changes.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_sqlx("Failed to update user", e))
    }
}
