use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::db::Repository;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserChanges};
use crate::services::auth::JwtKeys;
use crate::services::auth::password::{hash_password, verify_password};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials";

// Unknown emails are verified against a hash of this, so every login attempt
// runs one argon2 verification.
const UNKNOWN_ACCOUNT_PASSWORD: &str = "no-such-account";

fn validate_email(email: &str) -> AppResult<()> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(AppError::Validation("A valid email address is required".to_string()))
    }
}

/// Registration, login and profile management.
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn Repository>,
    keys: Arc<JwtKeys>,
    unknown_account_hash: Arc<OnceCell<String>>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn Repository>, keys: Arc<JwtKeys>) -> Self {
        Self {
            repository,
            keys,
            unknown_account_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn unknown_account_hash(&self) -> AppResult<String> {
        self.unknown_account_hash
            .get_or_try_init(|| async {
                tokio::task::spawn_blocking(|| hash_password(UNKNOWN_ACCOUNT_PASSWORD))
                    .await
                    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            })
            .await
            .cloned()
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> AppResult<User> {
        let email = email.trim();
        validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".to_string()));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

        let user = self
            .repository
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                name: name.to_string(),
            })
            .await
            .map_err(|e| match e {
                AppError::BadRequest(_) => AppError::BadRequest("Email already registered".to_string()),
                other => other,
            })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Returns a signed bearer token. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string());

        let credentials = self.repository.get_user_credentials(email.trim()).await?;
        let stored_hash = match &credentials {
            Some(credentials) => credentials.password_hash.clone(),
            None => self.unknown_account_hash().await?,
        };

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

        let credentials = match credentials {
            Some(credentials) if matches => credentials,
            Some(credentials) => {
                warn!("Failed login for user {}", credentials.id);
                return Err(invalid());
            }
            None => {
                debug!("Login attempt for unknown email");
                return Err(invalid());
            }
        };

        self.keys.generate_token(credentials.id, Some(&credentials.email))
    }

    pub async fn get_profile(&self, user_id: i64) -> AppResult<User> {
        self.repository
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(&self, user_id: i64, changes: UserChanges) -> AppResult<User> {
        if let Some(email) = changes.email.as_deref() {
            validate_email(email)?;
        }

        self.repository
            .update_user(user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
