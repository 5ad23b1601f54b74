//! Book model, catalog queries and stock rules

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use super::category::Category;
use super::loan::LoanRuleViolation;
use crate::error::{AppError, AppResult};

/// ISBN-13 without separators
static ISBN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13}$").expect("valid ISBN regex"));

/// Book row from database.
///
/// `available` is a generated column (`stock > 0`), it is never written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub description: String,
    pub pages: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub rating: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: i32,
    pub available: bool,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }

    /// A book can be lent only while copies remain in stock
    pub fn ensure_borrowable(&self) -> Result<(), LoanRuleViolation> {
        if !self.is_available() {
            return Err(LoanRuleViolation::BookUnavailable {
                title: self.title.clone(),
            });
        }
        Ok(())
    }

    /// Stock after applying `delta` copies; stock can never go below zero
    pub fn adjusted_stock(&self, delta: i32) -> AppResult<i32> {
        let stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| AppError::Validation("Stock adjustment out of range".to_string()))?;
        if stock < 0 {
            return Err(AppError::Validation(format!(
                "Insufficient stock for \"{}\": {} in stock, {} requested",
                self.title, self.stock, -delta
            )));
        }
        Ok(stock)
    }
}

/// Book with its author and category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: Author,
    pub category: Option<Category>,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub description: String,
    pub pages: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub rating: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: i32,
    pub available: bool,
}

/// Internal row for book queries joined with authors and categories
#[derive(Debug, Clone, FromRow)]
pub struct BookDetailsRow {
    #[sqlx(flatten)]
    book: Book,
    author_name: String,
    author_nationality: String,
    author_biography: Option<String>,
    category_name: Option<String>,
    category_description: Option<String>,
}

impl From<BookDetailsRow> for BookDetails {
    fn from(row: BookDetailsRow) -> Self {
        let book = row.book;
        let category = match (book.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                description: row.category_description,
            }),
            _ => None,
        };

        BookDetails {
            id: book.id,
            title: book.title,
            author: Author {
                id: book.author_id,
                name: row.author_name,
                nationality: row.author_nationality,
                biography: row.author_biography,
            },
            category,
            isbn: book.isbn,
            publication_date: book.publication_date,
            description: book.description,
            pages: book.pages,
            rating: book.rating,
            image_url: book.image_url,
            stock: book.stock,
            available: book.available,
        }
    }
}

/// Create or replace a book
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub author_id: i32,
    pub category_id: Option<i32>,
    /// 13 digits, no separators
    #[validate(regex(path = *ISBN_RE, message = "ISBN must have 13 numeric digits"))]
    pub isbn: String,
    pub publication_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, message = "Pages must be positive"))]
    pub pages: Option<i32>,
    /// 0.0 to 5.0
    #[schema(value_type = Option<f64>)]
    pub rating: Option<Decimal>,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
    /// Copies on the shelf (default 1)
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
}

impl BookInput {
    /// Field validation plus the rating bounds
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(rating) = self.rating {
            if rating < Decimal::ZERO || rating > Decimal::from(5) {
                return Err(AppError::Validation(
                    "rating: Rating must be between 0 and 5".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn stock_or_default(&self) -> i32 {
        self.stock.unwrap_or(1)
    }
}

/// Stock adjustment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct StockAdjustment {
    /// Copies to add (positive) or remove (negative)
    pub delta: i32,
}

/// Sort orders accepted by the book listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
pub enum BookOrdering {
    #[default]
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "-title")]
    TitleDesc,
    #[serde(rename = "publication_date")]
    PublicationDate,
    #[serde(rename = "-publication_date")]
    PublicationDateDesc,
}

impl BookOrdering {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            BookOrdering::Title => "b.title ASC, b.id ASC",
            BookOrdering::TitleDesc => "b.title DESC, b.id DESC",
            BookOrdering::PublicationDate => "b.publication_date ASC, b.id ASC",
            BookOrdering::PublicationDateDesc => "b.publication_date DESC, b.id DESC",
        }
    }
}

/// Book search parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Only books with (true) or without (false) stock
    pub available: Option<bool>,
    pub category_id: Option<i32>,
    pub author_id: Option<i32>,
    /// Case-insensitive search in title, ISBN and author name
    pub q: Option<String>,
    pub ordering: Option<BookOrdering>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    /// Rows to skip; pages too far out to address are a validation error
    pub fn offset(&self) -> AppResult<i64> {
        (self.page() - 1)
            .checked_mul(self.per_page())
            .ok_or_else(|| AppError::Validation("page: Page number out of range".to_string()))
    }

    /// Trimmed search term, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn book(stock: i32) -> Book {
        Book {
            id: 1,
            title: "Ficciones".to_string(),
            author_id: 1,
            category_id: None,
            isbn: "1234567890123".to_string(),
            publication_date: NaiveDate::from_ymd_opt(1944, 1, 1).unwrap(),
            description: String::new(),
            pages: Some(200),
            rating: None,
            image_url: None,
            stock,
            available: stock > 0,
        }
    }

    fn input(isbn: &str) -> BookInput {
        BookInput {
            title: "Ficciones".to_string(),
            author_id: 1,
            category_id: None,
            isbn: isbn.to_string(),
            publication_date: NaiveDate::from_ymd_opt(1944, 1, 1).unwrap(),
            description: String::new(),
            pages: None,
            rating: None,
            image_url: None,
            stock: None,
        }
    }

    #[test]
    fn adding_stock_keeps_book_available() {
        assert_eq!(book(5).adjusted_stock(2).unwrap(), 7);
        assert_eq!(book(5).adjusted_stock(-3).unwrap(), 2);
    }

    #[test]
    fn stock_can_drop_to_exactly_zero() {
        let b = book(5);
        assert_eq!(b.adjusted_stock(-5).unwrap(), 0);
    }

    #[test]
    fn stock_cannot_go_negative() {
        let err = book(5).adjusted_stock(-10).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn only_books_in_stock_are_borrowable() {
        assert!(book(1).ensure_borrowable().is_ok());
        let err = book(0).ensure_borrowable().unwrap_err();
        assert_eq!(
            err,
            LoanRuleViolation::BookUnavailable {
                title: "Ficciones".to_string()
            }
        );
    }

    #[rstest]
    #[case("1234567890123", true)]
    #[case("9780307474728", true)]
    #[case("1234567890", false)]
    #[case("12345678901234", false)]
    #[case("978-030747472", false)]
    #[case("97803074747X8", false)]
    fn isbn_must_be_thirteen_digits(#[case] isbn: &str, #[case] valid: bool) {
        assert_eq!(input(isbn).validate().is_ok(), valid);
    }

    #[test]
    fn rating_is_bounded() {
        let mut book = input("1234567890123");
        book.rating = Some(Decimal::new(45, 1));
        assert!(book.check().is_ok());
        book.rating = Some(Decimal::new(51, 1));
        assert!(matches!(book.check(), Err(AppError::Validation(_))));
    }

    #[test]
    fn stock_defaults_to_one_copy() {
        assert_eq!(input("1234567890123").stock_or_default(), 1);
    }

    #[test]
    fn query_paging_is_clamped() {
        let query = BookQuery {
            page: Some(0),
            per_page: Some(1000),
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 100);
        assert_eq!(query.search_term(), None);
        assert_eq!(query.offset().unwrap(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let query = BookQuery {
            page: Some(3),
            per_page: Some(25),
            ..Default::default()
        };
        assert_eq!(query.offset().unwrap(), 50);
    }

    #[test]
    fn unreachable_page_is_rejected() {
        let query = BookQuery {
            page: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(query.offset(), Err(AppError::Validation(_))));
    }
}
