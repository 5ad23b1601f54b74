//! Business logic services

pub mod authors;
pub mod catalog;
pub mod dashboard;
pub mod loans;
pub mod users;

use crate::{config::AppConfig, models::LoanPolicy, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub authors: authors::AuthorsService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub dashboard: dashboard::DashboardService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            authors: authors::AuthorsService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), LoanPolicy::from(&config.loans)),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            repository,
        }
    }

    /// Database round-trip for readiness probes
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
