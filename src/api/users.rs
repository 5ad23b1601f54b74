//! User administration endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::user::{User, UserQuery},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List users (administrators only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Users", body = PaginatedResponse<User>),
        (status = 400, description = "Page out of range"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    claims.require_admin()?;

    let (items, total) = state.services.users.list_users(&query).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}
