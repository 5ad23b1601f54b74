//! User model, account types and JWT claims

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Account type slug stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Reader,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Reader => "reader",
            AccountType::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(AccountType::Reader),
            "admin" => Ok(AccountType::Admin),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for AccountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AccountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AccountType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// User from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }
}

/// Short user representation embedded in loans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
}

impl From<&User> for UserShort {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Register a reader account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Paging for the user listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl UserQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> Result<i64, AppError> {
        (self.page() - 1)
            .checked_mul(self.per_page())
            .ok_or_else(|| AppError::Validation("page: Page number out of range".to_string()))
    }
}

/// Access tokens authorize requests; refresh tokens only mint new access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Tokens handed out on sign-in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthTokens {
    pub access_token: String,
    /// Absent when only the access token was renewed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountType,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_user(user: &User, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.username.clone(),
            user_id: user.id,
            account_type: user.account_type,
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn require_access_token(&self) -> Result<(), AppError> {
        match self.token_type {
            TokenType::Access => Ok(()),
            TokenType::Refresh => Err(AppError::Authentication(
                "Refresh tokens cannot be used to authorize requests".to_string(),
            )),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn reader() -> User {
        User {
            id: 7,
            username: "lector".to_string(),
            email: None,
            password: "hash".to_string(),
            account_type: AccountType::Reader,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_user_identity() {
        let claims = UserClaims::for_user(&reader(), TokenType::Access, Duration::minutes(5));
        let token = claims.create_token(SECRET).unwrap();

        let parsed = UserClaims::from_token(&token, SECRET).unwrap();
        assert_eq!(parsed.user_id, 7);
        assert_eq!(parsed.sub, "lector");
        assert!(parsed.require_access_token().is_ok());
        assert!(matches!(parsed.require_admin(), Err(AppError::Authorization(_))));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let claims = UserClaims::for_user(&reader(), TokenType::Access, Duration::minutes(5));
        let token = claims.create_token(SECRET).unwrap();
        assert!(UserClaims::from_token(&token, "another-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = UserClaims::for_user(&reader(), TokenType::Access, Duration::hours(-2));
        let token = claims.create_token(SECRET).unwrap();
        assert!(UserClaims::from_token(&token, SECRET).is_err());
    }

    #[test]
    fn refresh_token_does_not_authorize_requests() {
        let claims = UserClaims::for_user(&reader(), TokenType::Refresh, Duration::hours(1));
        assert!(matches!(
            claims.require_access_token(),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn user_listing_offset_is_checked() {
        let query = UserQuery {
            page: Some(2),
            per_page: None,
        };
        assert_eq!(query.offset().unwrap(), 50);

        let query = UserQuery {
            page: Some(i64::MAX),
            per_page: Some(10),
        };
        assert!(matches!(query.offset(), Err(AppError::Validation(_))));
    }

    #[test]
    fn account_type_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<AccountType>().unwrap(), AccountType::Admin);
        assert!("librarian".parse::<AccountType>().is_err());
    }
}
