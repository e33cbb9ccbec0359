//! Request bodies and query strings.

use serde::Deserialize;
use validator::Validate;

use super::validation::no_control_chars;
use crate::auth::{FirstAdminRequest, InvitationRegistrationRequest, ProfileUpdate};
use crate::board::{NewPost, PostKind, PostQuery, ReadFilter, ReplyFilter};
use crate::db::Role;
use crate::web::error::ApiError;

/// POST /api/auth/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Role to act in; required when the account holds several.
    #[serde(default)]
    pub role: Option<Role>,
}

/// POST /api/setup/admin
#[derive(Debug, Deserialize, Validate)]
pub struct SetupAdminRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<SetupAdminRequest> for FirstAdminRequest {
    fn from(req: SetupAdminRequest) -> Self {
        Self {
            username: req.username,
            password: req.password,
            password_confirm: req.password_confirm,
            email: req.email,
        }
    }
}

/// POST /api/auth/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub invitation_code: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

impl From<RegisterRequest> for InvitationRegistrationRequest {
    fn from(req: RegisterRequest) -> Self {
        Self {
            invitation_code: req.invitation_code,
            username: req.username,
            password: req.password,
            password_confirm: req.password_confirm,
        }
    }
}

/// POST /api/auth/one-time-password
#[derive(Debug, Deserialize, Validate)]
pub struct RedeemOneTimePasswordRequest {
    pub email: String,
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub new_password: String,
}

/// PUT /api/auth/me
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub preferred_first_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            preferred_first_name: req.preferred_first_name,
            email: req.email,
        }
    }
}

/// PUT /api/auth/me/password
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// PUT /api/admin/users/{username}/roles
#[derive(Debug, Deserialize, Validate)]
pub struct SetRoleRequest {
    pub role: Role,
    pub enabled: bool,
}

/// POST /api/admin/invitations
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: Role,
}

/// POST /api/admin/one-time-passwords
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOneTimePasswordRequest {
    pub email: String,
}

/// POST /api/threads
#[derive(Debug, Deserialize, Validate)]
pub struct CreateThreadRequest {
    #[validate(custom(function = "no_control_chars"))]
    pub name: String,
}

/// POST /api/posts
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    /// Defaults to the General thread.
    #[serde(default)]
    pub thread: Option<String>,
    #[validate(custom(function = "no_control_chars"))]
    pub title: String,
    #[validate(custom(function = "no_control_chars"))]
    pub content: String,
    /// "post" or "question".
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl CreatePostRequest {
    /// Convert into a [`NewPost`]; the author is filled in by the board.
    pub fn into_new_post(self) -> Result<NewPost, ApiError> {
        let kind = parse_kind(self.kind.as_deref())?.unwrap_or_default();
        let mut post = NewPost::new("", self.title, self.content)
            .with_kind(kind)
            .private(self.is_private)
            .anonymous(self.is_anonymous);
        if let Some(thread) = self.thread {
            post = post.in_thread(thread);
        }
        Ok(post)
    }
}

/// PUT /api/posts/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(custom(function = "no_control_chars"))]
    pub title: String,
    #[validate(custom(function = "no_control_chars"))]
    pub content: String,
}

/// POST /api/posts/{id}/replies, PUT /api/replies/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(custom(function = "no_control_chars"))]
    pub content: String,
}

/// PUT /api/posts/{id}/read, PUT /api/replies/{id}/read
#[derive(Debug, Deserialize, Validate)]
pub struct ReadStateRequest {
    pub read: bool,
}

/// Query string for GET /api/posts and GET /api/posts/mine.
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub keyword: Option<String>,
    /// Thread name; "all" matches every thread.
    pub thread: Option<String>,
    pub author: Option<String>,
    pub kind: Option<String>,
    /// "read" or "unread"; anything else matches both.
    pub read: Option<String>,
    /// Also list soft-deleted posts (their content is already replaced).
    pub include_deleted: Option<bool>,
}

impl PostListQuery {
    pub fn to_post_query(&self) -> Result<PostQuery, ApiError> {
        let mut query = PostQuery::new();
        if let Some(keyword) = non_blank(&self.keyword) {
            query = query.keyword(keyword);
        }
        if let Some(thread) = non_blank(&self.thread) {
            query = query.thread(thread);
        }
        if let Some(author) = non_blank(&self.author) {
            query = query.author(author);
        }
        if let Some(kind) = parse_kind(self.kind.as_deref())? {
            query = query.kind(kind);
        }
        if let Some(read) = non_blank(&self.read) {
            query = query.read(ReadFilter::parse(read));
        }
        if self.include_deleted == Some(true) {
            query = query.include_deleted(true);
        }
        Ok(query)
    }
}

/// Query string for GET /api/posts/{id}/replies.
#[derive(Debug, Default, Deserialize)]
pub struct ReplyListQuery {
    /// "unread" lists only unread replies.
    pub filter: Option<String>,
}

impl ReplyListQuery {
    pub fn filter(&self) -> ReplyFilter {
        self.filter
            .as_deref()
            .map(ReplyFilter::parse)
            .unwrap_or_default()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_kind(kind: Option<&str>) -> Result<Option<PostKind>, ApiError> {
    match kind.map(str::trim).filter(|k| !k.is_empty()) {
        None => Ok(None),
        Some(kind) => kind
            .parse()
            .map(Some)
            .map_err(|_| ApiError::unprocessable(format!("unknown post kind: {kind}"))),
    }
}
