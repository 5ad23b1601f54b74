//! Loans repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{Loan, LoanFilter, LoanPolicy},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lend one copy of a book.
    ///
    /// Runs in a single transaction with the user and book rows locked, so
    /// concurrent borrows can neither oversell the stock nor push the user
    /// past the active loan limit. Nothing is written when a rule fails.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        due_on: NaiveDate,
        today: NaiveDate,
        policy: &LoanPolicy,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        book.ensure_borrowable()?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND returned_on IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        policy.ensure_within_limit(active)?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrowed_on, due_on)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(today)
        .bind(due_on)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET stock = stock - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Close one of the user's loans and put the copy back on the shelf
    pub async fn return_loan(&self, loan_id: i32, user_id: i32, today: NaiveDate) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let mut loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(loan_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;

        loan.mark_returned(today)?;

        sqlx::query("UPDATE loans SET returned_on = $1 WHERE id = $2")
            .bind(loan.returned_on)
            .bind(loan.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET stock = stock + 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Get one of the user's loans
    pub async fn get_for_user(&self, loan_id: i32, user_id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 AND user_id = $2")
            .bind(loan_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))
    }

    /// The user's loans, newest first
    pub async fn list_for_user(&self, user_id: i32, filter: LoanFilter) -> AppResult<Vec<Loan>> {
        let query = format!(
            "SELECT l.* FROM loans l WHERE l.user_id = $1 AND {} ORDER BY l.borrowed_on DESC, l.id DESC",
            filter.sql_condition()
        );
        let loans = sqlx::query_as::<_, Loan>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    pub async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND returned_on IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
