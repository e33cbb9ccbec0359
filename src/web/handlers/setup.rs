//! First-run setup handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::{setup_first_admin, UserProfile};
use crate::web::dto::{ApiResponse, SetupAdminRequest, SetupStatusResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/setup/status
pub async fn setup_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SetupStatusResponse>>, ApiError> {
    Ok(Json(ApiResponse::new(SetupStatusResponse {
        needs_setup: state.db.is_empty().await,
    })))
}

/// POST /api/setup/admin - Create the first administrator on an empty database.
pub async fn create_first_admin(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SetupAdminRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user = setup_first_admin(&state.db, req.into()).await?;
    Ok(Json(ApiResponse::new(UserProfile::from(user))))
}
