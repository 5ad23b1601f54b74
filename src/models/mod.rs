//! Data models for Biblioteca

pub mod author;
pub mod book;
pub mod category;
pub mod dashboard;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails};
pub use category::Category;
pub use dashboard::Dashboard;
pub use loan::{Loan, LoanDetails, LoanPolicy, LoanRuleViolation};
pub use user::{User, UserShort};
