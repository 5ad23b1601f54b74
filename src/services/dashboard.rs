//! Home page summary

use crate::{error::AppResult, models::Dashboard, repository::Repository};

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Catalog totals, the user's active loans and books grouped by category
    pub async fn summary(&self, user_id: i32) -> AppResult<Dashboard> {
        Ok(Dashboard {
            total_books: self.repository.books.count_all().await?,
            available_books: self.repository.books.count_available().await?,
            active_loans: self.repository.loans.count_active_for_user(user_id).await?,
            categories: self.repository.categories.list_with_books().await?,
        })
    }
}
