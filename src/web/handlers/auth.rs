//! Authentication and account handlers.

use axum::{extract::State, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::auth::{
    authenticate, change_password, redeem_one_time_password,
    register_with_invitation, update_profile, UserProfile,
};
use crate::config::AccountsConfig;
use crate::db::{Database, Role, User, UserRepository};
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    RedeemOneTimePasswordRequest, RegisterRequest, UpdateProfileRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub encoding_key: EncodingKey,
    /// Access token lifetime in seconds.
    pub access_token_expiry: u64,
    pub accounts: AccountsConfig,
    /// Timezone used for `created_local` fields.
    pub timezone: String,
}

impl AppState {
    pub fn new(db: Arc<Database>, jwt_secret: &str, access_expiry: u64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            accounts: AccountsConfig::default(),
            timezone: "UTC".to_string(),
        }
    }

    pub fn with_accounts(mut self, accounts: AccountsConfig) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sign an access token for `user` acting as `role`.
    pub fn generate_access_token(&self, user: &User, role: Role) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            role,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JWT");
            ApiError::internal("Failed to generate token")
        })
    }

    /// Load the account behind a token. The acting role must still be held.
    pub async fn current_user(&self, claims: &JwtClaims) -> Result<User, ApiError> {
        let user = UserRepository::new(self.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

        if !user.has_role(claims.role) {
            return Err(ApiError::forbidden(format!(
                "You no longer have the {} role",
                claims.role.display_name()
            )));
        }
        Ok(user)
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let session = authenticate(&state.db, &req.username, &req.password, req.role).await?;
    let access_token = state.generate_access_token(&session.user, session.role)?;

    tracing::info!(
        username = %session.user.username,
        role = session.role.as_str(),
        "User logged in"
    );

    Ok(Json(ApiResponse::new(LoginResponse {
        access_token,
        expires_in: state.access_token_expiry,
        role: session.role,
        user: UserProfile::from(session.user),
    })))
}

/// POST /api/auth/register - Create an account from an invitation code.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user = register_with_invitation(&state.db, req.into()).await?;
    Ok(Json(ApiResponse::new(UserProfile::from(user))))
}

/// POST /api/auth/one-time-password - Set a new password with a one-time code.
pub async fn redeem_one_time_password_handler(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RedeemOneTimePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    redeem_one_time_password(&state.db, &req.email, &req.code, &req.new_password).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Password updated. You can now log in.",
    ))))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    Ok(Json(ApiResponse::new(MeResponse {
        profile: UserProfile::from(user),
        acting_role: claims.role,
    })))
}

/// PUT /api/auth/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    let profile = update_profile(&state.db, user.id, req.into()).await?;

    Ok(Json(ApiResponse::new(MeResponse {
        profile,
        acting_role: claims.role,
    })))
}

/// PUT /api/auth/me/password
pub async fn change_my_password(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    change_password(&state.db, user.id, &req.current_password, &req.new_password).await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Password changed."))))
}
