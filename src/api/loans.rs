//! Loan endpoints. Every route works on the caller's own loans.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, LoanDetails, LoanFilter, LoanQuery},
};

use super::AuthenticatedUser;

/// List the caller's loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .loans
        .list(claims.user_id, query.status.unwrap_or_default())
        .await?;
    Ok(Json(loans))
}

/// Loans not yet returned
#[utoipa::path(
    get,
    path = "/loans/active",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn active_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list(claims.user_id, LoanFilter::Active).await?;
    Ok(Json(loans))
}

/// Returned loans
#[utoipa::path(
    get,
    path = "/loans/history",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Returned loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn loan_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list(claims.user_id, LoanFilter::Returned).await?;
    Ok(Json(loans))
}

/// Get one loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(id, claims.user_id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Book unavailable or loan limit reached", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state.services.loans.borrow(claims.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LoanDetails),
        (status = 400, description = "Loan already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.return_loan(id, claims.user_id).await?;
    Ok(Json(loan))
}
