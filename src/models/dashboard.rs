//! Home page summary

use serde::Serialize;
use utoipa::ToSchema;

use super::category::CategoryWithBooks;

/// Library totals plus the viewing user's active loans
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_books: i64,
    pub available_books: i64,
    pub active_loans: i64,
    pub categories: Vec<CategoryWithBooks>,
}
