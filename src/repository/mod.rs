//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod categories;
pub mod loans;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::error::AppError;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub categories: categories::CategoriesRepository,
    pub books: books::BooksRepository,
    pub loans: loans::LoansRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            categories: categories::CategoriesRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }

    /// Cheap connectivity probe used by the readiness check
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Maps unique index violations (a concurrent insert won the race) to a conflict
pub(crate) fn on_unique_violation(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |err: sqlx::Error| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
