//! Loan (borrow) model, borrowing policy and loan rule violations

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};

use super::book::BookDetails;
use super::user::UserShort;
use crate::config::LoansConfig;
use crate::error::{AppError, AppResult};

/// Business rules a borrow or return can break
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanRuleViolation {
    #[error("The book \"{title}\" is not available")]
    BookUnavailable { title: String },

    #[error("The user has reached the limit of {limit} active loans")]
    LoanLimitReached { limit: i64 },

    #[error("This book has already been returned")]
    AlreadyReturned,
}

impl LoanRuleViolation {
    /// Request field the violation is reported against
    pub fn field(&self) -> &'static str {
        match self {
            LoanRuleViolation::BookUnavailable { .. } => "book",
            LoanRuleViolation::LoanLimitReached { .. } => "user",
            LoanRuleViolation::AlreadyReturned => "returned_on",
        }
    }
}

/// Loan row from database. `returned_on` is `None` while the loan is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.returned_on.is_some()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_returned() && today > self.due_on
    }

    /// Close the loan. A loan can only be returned once.
    pub fn mark_returned(&mut self, today: NaiveDate) -> Result<(), LoanRuleViolation> {
        if self.is_returned() {
            return Err(LoanRuleViolation::AlreadyReturned);
        }
        self.returned_on = Some(today);
        Ok(())
    }
}

/// Limits applied when a user borrows a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub max_active_per_user: i64,
    pub default_loan_days: i64,
    pub max_loan_days: i64,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self::from(&LoansConfig::default())
    }
}

impl From<&LoansConfig> for LoanPolicy {
    fn from(config: &LoansConfig) -> Self {
        Self {
            max_active_per_user: config.max_active_per_user,
            default_loan_days: config.default_loan_days,
            max_loan_days: config.max_loan_days,
        }
    }
}

impl LoanPolicy {
    /// Requested loan length, or the default when none was given
    pub fn resolve_days(&self, requested: Option<i64>) -> AppResult<i64> {
        let days = requested.unwrap_or(self.default_loan_days);
        if days < 1 || days > self.max_loan_days {
            return Err(AppError::Validation(format!(
                "loan_days must be between 1 and {}",
                self.max_loan_days
            )));
        }
        Ok(days)
    }

    pub fn due_date(&self, today: NaiveDate, days: i64) -> NaiveDate {
        today + Duration::days(days)
    }

    pub fn ensure_within_limit(&self, active_loans: i64) -> Result<(), LoanRuleViolation> {
        if active_loans >= self.max_active_per_user {
            return Err(LoanRuleViolation::LoanLimitReached {
                limit: self.max_active_per_user,
            });
        }
        Ok(())
    }
}

/// Loan with borrower and book for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub user: UserShort,
    pub book: BookDetails,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    pub returned: bool,
    pub overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, user: UserShort, book: BookDetails, today: NaiveDate) -> Self {
        Self {
            returned: loan.is_returned(),
            overdue: loan.is_overdue(today),
            id: loan.id,
            user,
            book,
            borrowed_on: loan.borrowed_on,
            due_on: loan.due_on,
            returned_on: loan.returned_on,
        }
    }
}

/// Borrow request. The borrower is always the authenticated user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    /// Book to borrow
    pub book_id: i32,
    /// Loan length in days (defaults to the configured loan length)
    pub loan_days: Option<i64>,
}

/// Which of a user's loans to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanFilter {
    #[default]
    All,
    Active,
    Returned,
}

impl LoanFilter {
    pub(crate) fn sql_condition(&self) -> &'static str {
        match self {
            LoanFilter::All => "TRUE",
            LoanFilter::Active => "l.returned_on IS NULL",
            LoanFilter::Returned => "l.returned_on IS NOT NULL",
        }
    }
}

/// Query parameters for listing loans
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    /// all (default), active or returned
    pub status: Option<LoanFilter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn active_loan() -> Loan {
        Loan {
            id: 1,
            user_id: 10,
            book_id: 20,
            borrowed_on: date(2025, 3, 1),
            due_on: date(2025, 3, 8),
            returned_on: None,
        }
    }

    #[test]
    fn default_policy_allows_three_active_loans() {
        let policy = LoanPolicy::default();
        assert!(policy.ensure_within_limit(0).is_ok());
        assert!(policy.ensure_within_limit(2).is_ok());
        assert_eq!(
            policy.ensure_within_limit(3),
            Err(LoanRuleViolation::LoanLimitReached { limit: 3 })
        );
    }

    #[test]
    fn due_date_is_today_plus_loan_days() {
        let policy = LoanPolicy::default();
        let days = policy.resolve_days(None).unwrap();
        assert_eq!(days, 7);
        assert_eq!(policy.due_date(date(2025, 12, 28), days), date(2026, 1, 4));
    }

    #[test]
    fn loan_days_outside_bounds_are_rejected() {
        let policy = LoanPolicy::default();
        assert!(matches!(policy.resolve_days(Some(0)), Err(AppError::Validation(_))));
        assert!(matches!(policy.resolve_days(Some(-3)), Err(AppError::Validation(_))));
        assert!(matches!(policy.resolve_days(Some(61)), Err(AppError::Validation(_))));
        assert_eq!(policy.resolve_days(Some(60)).unwrap(), 60);
    }

    #[test]
    fn returning_stamps_the_date_once() {
        let mut loan = active_loan();
        loan.mark_returned(date(2025, 3, 5)).unwrap();
        assert!(loan.is_returned());
        assert_eq!(loan.returned_on, Some(date(2025, 3, 5)));

        let second = loan.mark_returned(date(2025, 3, 6));
        assert_eq!(second, Err(LoanRuleViolation::AlreadyReturned));
        assert_eq!(loan.returned_on, Some(date(2025, 3, 5)));
    }

    #[test]
    fn overdue_only_while_active_and_past_due() {
        let mut loan = active_loan();
        assert!(!loan.is_overdue(date(2025, 3, 8)));
        assert!(loan.is_overdue(date(2025, 3, 9)));

        loan.mark_returned(date(2025, 3, 10)).unwrap();
        assert!(!loan.is_overdue(date(2025, 3, 20)));
    }

    #[test]
    fn violations_report_their_field() {
        let unavailable = LoanRuleViolation::BookUnavailable { title: "Rayuela".into() };
        assert_eq!(unavailable.field(), "book");
        assert!(unavailable.to_string().contains("Rayuela"));
        assert_eq!(LoanRuleViolation::AlreadyReturned.field(), "returned_on");
    }
}
