//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use validator::Validate;

use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult},
    models::user::{AccountType, AuthTokens, CreateUser, TokenType, User, UserClaims, UserQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by username and return an access/refresh token pair
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(AuthTokens, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let access_token = self.issue(&user, TokenType::Access)?;
        let refresh_token = self.issue(&user, TokenType::Refresh)?;

        tracing::info!(user_id = user.id, username = %user.username, "user signed in");

        Ok((
            AuthTokens {
                access_token,
                refresh_token: Some(refresh_token),
                token_type: "Bearer".to_string(),
                expires_in: self.config.access_token_minutes * 60,
            },
            user,
        ))
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = UserClaims::from_token(refresh_token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("A refresh token is required".to_string()));
        }

        // Account type may have changed since the refresh token was issued
        let user = self.repository.users.get_by_id(claims.user_id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Authentication("Unknown user".to_string()),
            other => other,
        })?;

        Ok(AuthTokens {
            access_token: self.issue(&user, TokenType::Access)?,
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_minutes * 60,
        })
    }

    /// Verify a session token and return its claims
    pub fn verify_access_token(&self, token: &str) -> AppResult<UserClaims> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;
        claims.require_access_token()?;
        Ok(claims)
    }

    /// Create a reader account
    pub async fn register(&self, data: CreateUser) -> AppResult<User> {
        data.validate()?;
        let username = data.username.trim();

        if self.repository.users.username_exists(username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let hash = hash_password(&data.password)?;
        let user = self
            .repository
            .users
            .create(username, data.email.as_deref(), &hash, AccountType::Reader)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "reader account created");
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.list(query).await
    }

    /// Create the configured administrator when the database has none.
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_superuser(&self, admin: &AdminConfig) -> AppResult<bool> {
        if self.repository.users.any_admin_exists().await? {
            tracing::debug!("administrator account already present");
            return Ok(false);
        }

        let Some(password) = admin.password.as_deref() else {
            tracing::warn!("no administrator account and no admin password configured, skipping");
            return Ok(false);
        };

        if self.repository.users.username_exists(&admin.username).await? {
            tracing::warn!(username = %admin.username, "admin username is taken by a reader account, skipping");
            return Ok(false);
        }

        let hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(&admin.username, admin.email.as_deref(), &hash, AccountType::Admin)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "administrator account created");
        Ok(true)
    }

    fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let ttl = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => Duration::hours(self.config.refresh_token_hours),
        };
        UserClaims::for_user(user, token_type, ttl)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            username: "ana".to_string(),
            email: None,
            password: hash_password(password).unwrap(),
            account_type: AccountType::Reader,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hashed_password_verifies() {
        let user = user_with_password("correct horse");
        assert!(user.password.starts_with("$argon2"));
        assert!(verify_password(&user, "correct horse").unwrap());
        assert!(!verify_password(&user, "wrong horse").unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("secret123").unwrap(), hash_password("secret123").unwrap());
    }
}
