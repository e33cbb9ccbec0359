//! Administrator handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::admin::{AccessAdminService, IssuedOneTimePassword, UserAdminService, UserSummary};
use crate::db::{Role, User};
use crate::web::dto::{
    ApiResponse, CountResponse, CreateInvitationRequest, CreateOneTimePasswordRequest,
    InvitationResponse, MessageResponse, SetRoleRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JwtClaims};

/// The signed-in administrator, re-read from the database.
async fn require_admin(state: &AppState, claims: &JwtClaims) -> Result<User, ApiError> {
    if claims.role != Role::Admin {
        return Err(ApiError::forbidden("Sign in as an administrator to do this"));
    }
    state.current_user(claims).await
}

fn access_service(state: &AppState) -> AccessAdminService<'_> {
    AccessAdminService::new(
        &state.db,
        state.accounts.invitation_validity_minutes,
        state.accounts.one_time_password_validity_minutes,
    )
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    let users = UserAdminService::new(&state.db).list_users(&admin).await?;
    Ok(Json(ApiResponse::new(users)))
}

/// DELETE /api/admin/users/:username
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    UserAdminService::new(&state.db)
        .delete_user(&admin, &username)
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(format!(
        "User {username} deleted."
    )))))
}

/// PUT /api/admin/users/:username/roles
pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<SetRoleRequest>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    let user = UserAdminService::new(&state.db)
        .set_role(&admin, &username, req.role, req.enabled)
        .await?;
    Ok(Json(ApiResponse::new(user)))
}

/// POST /api/admin/invitations
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<Json<ApiResponse<InvitationResponse>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    let invitation = access_service(&state)
        .issue_invitation(&admin, &req.email, req.role)
        .await?;
    Ok(Json(ApiResponse::new(invitation.into())))
}

/// GET /api/admin/invitations/count
pub async fn invitation_count(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    let count = access_service(&state).invitation_count(&admin).await?;
    Ok(Json(ApiResponse::new(CountResponse { count })))
}

/// POST /api/admin/one-time-passwords
pub async fn create_one_time_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateOneTimePasswordRequest>,
) -> Result<Json<ApiResponse<IssuedOneTimePassword>>, ApiError> {
    let admin = require_admin(&state, &claims).await?;
    let otp = access_service(&state)
        .issue_one_time_password(&admin, &req.email)
        .await?;
    Ok(Json(ApiResponse::new(otp)))
}
