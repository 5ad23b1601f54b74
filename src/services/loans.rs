//! Loan management service

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookDetails,
        loan::{CreateLoan, Loan, LoanDetails, LoanFilter, LoanPolicy},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: LoanPolicy,
}

impl LoansService {
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Borrow a book for the given user
    pub async fn borrow(&self, user_id: i32, request: CreateLoan) -> AppResult<LoanDetails> {
        let today = today();
        let days = self.policy.resolve_days(request.loan_days)?;
        let due_on = self.policy.due_date(today, days);

        let loan = match self
            .repository
            .loans
            .borrow(user_id, request.book_id, due_on, today, &self.policy)
            .await
        {
            Ok(loan) => loan,
            Err(AppError::BusinessRule(violation)) => {
                tracing::info!(user_id, book_id = request.book_id, %violation, "borrow refused");
                return Err(AppError::BusinessRule(violation));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(loan_id = loan.id, user_id, book_id = loan.book_id, due_on = %loan.due_on, "book borrowed");
        self.details(loan, today).await
    }

    /// Return one of the user's loans
    pub async fn return_loan(&self, loan_id: i32, user_id: i32) -> AppResult<LoanDetails> {
        let today = today();
        let loan = self.repository.loans.return_loan(loan_id, user_id, today).await?;
        tracing::info!(loan_id, user_id, book_id = loan.book_id, "book returned");
        self.details(loan, today).await
    }

    pub async fn get(&self, loan_id: i32, user_id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_for_user(loan_id, user_id).await?;
        self.details(loan, today()).await
    }

    /// The user's loans, newest first
    pub async fn list(&self, user_id: i32, filter: LoanFilter) -> AppResult<Vec<LoanDetails>> {
        let loans = self.repository.loans.list_for_user(user_id, filter).await?;
        if loans.is_empty() {
            return Ok(Vec::new());
        }

        let user = self.repository.users.get_short_by_id(user_id).await?;
        let mut book_ids: Vec<i32> = loans.iter().map(|l| l.book_id).collect();
        book_ids.sort_unstable();
        book_ids.dedup();
        let books: HashMap<i32, BookDetails> = self
            .repository
            .books
            .get_details_many(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let today = today();
        loans
            .into_iter()
            .map(|loan| -> AppResult<LoanDetails> {
                let book = books
                    .get(&loan.book_id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound(format!("Book {} not found", loan.book_id)))?;
                Ok(LoanDetails::new(loan, user.clone(), book, today))
            })
            .collect()
    }

    pub async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        self.repository.loans.count_active_for_user(user_id).await
    }

    async fn details(&self, loan: Loan, today: NaiveDate) -> AppResult<LoanDetails> {
        let user = self.repository.users.get_short_by_id(loan.user_id).await?;
        let book = self.repository.books.get_details(loan.book_id).await?;
        Ok(LoanDetails::new(loan, user, book, today))
    }
}

/// Loan dates are calendar days in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
