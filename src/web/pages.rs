//! Page handlers. Form errors are reported through flash messages.

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};

use super::{
    render,
    session::{clear_session_cookie, session_cookie, set_flash, take_flash, Flash, WebUser},
};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{BookDetails, BookInput, BookQuery},
        category::Category,
        loan::{CreateLoan, LoanDetails, LoanFilter},
        Dashboard,
    },
    AppState,
};

/// Errors a user can fix become a flash message; the rest propagate
fn flash_or_propagate(err: AppError) -> AppResult<Flash> {
    match err {
        AppError::Validation(_)
        | AppError::BusinessRule(_)
        | AppError::Conflict(_)
        | AppError::NotFound(_)
        | AppError::Authentication(_) => Ok(Flash::error(err.public_message())),
        other => Err(other),
    }
}

#[derive(Serialize)]
struct LoginPage {
    flash: Option<Flash>,
    user: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let (jar, flash) = take_flash(jar);
    let html = render(&state.templates, "login.html", &LoginPage { flash, user: None })?;
    Ok((jar, html))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<(CookieJar, Redirect)> {
    match state.services.users.authenticate(&form.username, &form.password).await {
        Ok((tokens, user)) => {
            let jar = jar.add(session_cookie(tokens.access_token, &state.config.auth));
            let jar = set_flash(jar, Flash::success(format!("Welcome, {}", user.username)));
            Ok((jar, Redirect::to("/")))
        }
        Err(e) => {
            let flash = flash_or_propagate(e)?;
            Ok((set_flash(jar, flash), Redirect::to("/login")))
        }
    }
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.add(clear_session_cookie());
    (set_flash(jar, Flash::success("Signed out")), Redirect::to("/login"))
}

#[derive(Serialize)]
struct HomePage {
    flash: Option<Flash>,
    user: String,
    dashboard: Dashboard,
    loan_limit: i64,
}

pub async fn home(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let (jar, flash) = take_flash(jar);
    let dashboard = state.services.dashboard.summary(claims.user_id).await?;
    let page = HomePage {
        flash,
        user: claims.sub,
        dashboard,
        loan_limit: state.services.loans.policy().max_active_per_user,
    };
    Ok((jar, render(&state.templates, "home.html", &page)?))
}

/// Catalog page filters; empty form fields mean "no filter"
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct BooksPageQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub q: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub category_id: Option<i32>,
}

#[derive(Serialize)]
struct BooksPage {
    flash: Option<Flash>,
    user: String,
    books: Vec<BookDetails>,
    total: i64,
    categories: Vec<Category>,
    q: String,
    category_id: Option<i32>,
}

pub async fn books(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
    Query(filter): Query<BooksPageQuery>,
) -> AppResult<(CookieJar, Html<String>)> {
    let (jar, flash) = take_flash(jar);
    let query = BookQuery {
        q: filter.q.clone(),
        category_id: filter.category_id,
        per_page: Some(100),
        ..Default::default()
    };
    let (books, total) = state.services.catalog.search_books(&query).await?;
    let categories = state.services.catalog.list_categories().await?;

    let page = BooksPage {
        flash,
        user: claims.sub,
        books,
        total,
        categories,
        q: filter.q.unwrap_or_default(),
        category_id: filter.category_id,
    };
    Ok((jar, render(&state.templates, "books.html", &page)?))
}

#[derive(Serialize)]
struct BookFormPage {
    flash: Option<Flash>,
    user: String,
    authors: Vec<Author>,
    categories: Vec<Category>,
}

pub async fn new_book_page(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let (jar, flash) = take_flash(jar);
    let page = BookFormPage {
        flash,
        user: claims.sub,
        authors: state.services.authors.list().await?,
        categories: state.services.catalog.list_categories().await?,
    };
    Ok((jar, render(&state.templates, "book_form.html", &page)?))
}

/// New book form. Optional inputs arrive as empty strings.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author_id: i32,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub category_id: Option<i32>,
    pub isbn: String,
    pub publication_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub rating: Option<Decimal>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub stock: Option<i32>,
}

impl From<BookForm> for BookInput {
    fn from(form: BookForm) -> Self {
        BookInput {
            title: form.title,
            author_id: form.author_id,
            category_id: form.category_id,
            isbn: form.isbn.trim().to_string(),
            publication_date: form.publication_date,
            description: form.description,
            pages: form.pages,
            rating: form.rating,
            image_url: form.image_url,
            stock: form.stock,
        }
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    WebUser(_claims): WebUser,
    jar: CookieJar,
    Form(form): Form<BookForm>,
) -> AppResult<(CookieJar, Redirect)> {
    match state.services.catalog.create_book(form.into()).await {
        Ok(book) => Ok((
            set_flash(jar, Flash::success(format!("\"{}\" added to the catalog", book.title))),
            Redirect::to("/books"),
        )),
        Err(e) => Ok((set_flash(jar, flash_or_propagate(e)?), Redirect::to("/books/new"))),
    }
}

#[derive(Serialize)]
struct LoansPage {
    flash: Option<Flash>,
    user: String,
    active: Vec<LoanDetails>,
    returned: Vec<LoanDetails>,
    loan_limit: i64,
}

pub async fn loans(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Html<String>)> {
    let (jar, flash) = take_flash(jar);
    let page = LoansPage {
        flash,
        active: state.services.loans.list(claims.user_id, LoanFilter::Active).await?,
        returned: state.services.loans.list(claims.user_id, LoanFilter::Returned).await?,
        loan_limit: state.services.loans.policy().max_active_per_user,
        user: claims.sub,
    };
    Ok((jar, render(&state.templates, "loans.html", &page)?))
}

#[derive(Deserialize)]
pub struct BorrowForm {
    pub book_id: i32,
}

pub async fn borrow(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
    Form(form): Form<BorrowForm>,
) -> AppResult<(CookieJar, Redirect)> {
    let request = CreateLoan { book_id: form.book_id, loan_days: None };
    match state.services.loans.borrow(claims.user_id, request).await {
        Ok(loan) => {
            let message = format!("\"{}\" is due on {}", loan.book.title, loan.due_on);
            Ok((set_flash(jar, Flash::success(message)), Redirect::to("/loans")))
        }
        Err(e) => Ok((set_flash(jar, flash_or_propagate(e)?), Redirect::to("/books"))),
    }
}

pub async fn return_loan(
    State(state): State<AppState>,
    WebUser(claims): WebUser,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<(CookieJar, Redirect)> {
    let flash = match state.services.loans.return_loan(id, claims.user_id).await {
        Ok(loan) => Flash::success(format!("\"{}\" returned", loan.book.title)),
        Err(e) => flash_or_propagate(e)?,
    };
    Ok((set_flash(jar, flash), Redirect::to("/loans")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_fields_become_none() {
        let form: BookForm = parse_form(
            "title=Rayuela&author_id=2&category_id=&isbn=9788437604572&publication_date=1963-06-28&pages=&rating=4.5&image_url=&stock=3",
        );
        assert_eq!(form.category_id, None);
        assert_eq!(form.pages, None);
        assert_eq!(form.rating, Some(Decimal::new(45, 1)));
        assert_eq!(form.image_url, None);
        assert_eq!(form.stock, Some(3));
        assert_eq!(form.description, "");

        let input = BookInput::from(form);
        assert!(input.check().is_ok());
    }

    #[test]
    fn empty_catalog_filters_are_ignored() {
        let query: BooksPageQuery = parse_form("q=&category_id=");
        assert_eq!(query.q, None);
        assert_eq!(query.category_id, None);
    }

    #[test]
    fn user_errors_become_flash_messages() {
        let flash = flash_or_propagate(AppError::Conflict("ISBN exists".to_string())).unwrap();
        assert_eq!(flash, Flash::error("ISBN exists"));
        assert!(flash_or_propagate(AppError::Internal("boom".to_string())).is_err());
    }

    fn parse_form<T: serde::de::DeserializeOwned>(body: &str) -> T {
        let uri: axum::http::Uri = format!("/?{}", body).parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }
}
