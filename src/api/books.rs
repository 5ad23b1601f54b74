//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{BookDetails, BookInput, BookQuery, StockAdjustment},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = PaginatedResponse<BookDetails>),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookDetails>>> {
    let (items, total) = state.services.catalog.search_books(&query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Get book details
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book with author and category", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(data): Json<BookInput>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    let book = state.services.catalog.create_book(data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Replace a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<BookInput>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.update_book(id, data).await?;
    Ok(Json(book))
}

/// Remove a book from the catalog
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add or withdraw copies
#[utoipa::path(
    post,
    path = "/books/{id}/stock",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock updated", body = BookDetails),
        (status = 400, description = "Stock would become negative", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn adjust_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(adjustment): Json<StockAdjustment>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.adjust_stock(id, adjustment.delta).await?;
    Ok(Json(book))
}
