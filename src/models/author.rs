//! Author model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Author from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    /// Full name, unique regardless of case
    pub name: String,
    /// Country of origin or main nationality
    pub nationality: String,
    /// Short biography or bibliography
    pub biography: Option<String>,
}

/// Create or replace an author
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(length(min = 2, max = 200, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Nationality is required"))]
    pub nationality: String,
    pub biography: Option<String>,
}

impl AuthorInput {
    /// Trim surrounding whitespace before validation and storage
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            nationality: self.nationality.trim().to_string(),
            biography: self
                .biography
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
        }
    }
}
