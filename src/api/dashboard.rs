//! Home dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::Dashboard};

use super::AuthenticatedUser;

/// Catalog totals, the caller's active loans and books by category
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard", body = Dashboard),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Dashboard>> {
    let dashboard = state.services.dashboard.summary(claims.user_id).await?;
    Ok(Json(dashboard))
}
