//! Category model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookDetails;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Create or replace a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// Category with its books, for the home page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryWithBooks {
    pub category: Category,
    pub books: Vec<BookDetails>,
}
