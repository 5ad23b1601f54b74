//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::category::{Category, CategoryInput},
};

use super::AuthenticatedUser;

/// List categories
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Categories ordered by name", body = Vec<Category>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Get category by ID
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(Json(category))
}

/// Create category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    security(("bearer_auth" = [])),
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Name already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(data): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.services.catalog.create_category(data).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Update category
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    let category = state.services.catalog.update_category(id, data).await?;
    Ok(Json(category))
}

/// Delete category. Its books become uncategorized.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found")
    )
)]
pub async fn delete_category(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
