//! Response bodies.

use serde::Serialize;

use crate::admin::IssuedInvitation;
use crate::auth::UserProfile;
use crate::board::{PostView, Reply, ReplyView};
use crate::datetime::format_datetime_default;
use crate::db::Role;

/// Success envelope: `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Plain confirmation text.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// HS256 access token.
    pub access_token: String,
    /// Lifetime of the token in seconds.
    pub expires_in: u64,
    /// Acting role for this session.
    pub role: Role,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    /// True until the first administrator exists.
    pub needs_setup: bool,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// A freshly issued invitation with the confirmation text for the admin.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    #[serde(flatten)]
    pub invitation: IssuedInvitation,
    pub message: String,
}

impl From<IssuedInvitation> for InvitationResponse {
    fn from(invitation: IssuedInvitation) -> Self {
        Self {
            message: invitation.message(),
            invitation,
        }
    }
}

/// Profile of the signed-in user plus the role they act in.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub acting_role: Role,
}

/// A post with its creation time in the board's timezone.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: PostView,
    pub created_local: String,
}

impl PostResponse {
    pub fn new(post: PostView, timezone: &str) -> Self {
        Self {
            created_local: format_datetime_default(&post.created_at, timezone),
            post,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub created_local: String,
    pub updated_at: Option<String>,
    /// Absent when read state was not looked up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

impl ReplyResponse {
    pub fn from_reply(reply: Reply, timezone: &str) -> Self {
        Self {
            author: reply.display_author().to_string(),
            created_local: format_datetime_default(&reply.created_at, timezone),
            id: reply.id,
            post_id: reply.post_id,
            content: reply.content,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
            is_read: None,
        }
    }

    pub fn from_view(reply: ReplyView, timezone: &str) -> Self {
        Self {
            author: reply.display_author().to_string(),
            created_local: format_datetime_default(&reply.created_at, timezone),
            id: reply.id,
            post_id: reply.post_id,
            content: reply.content,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
            is_read: Some(reply.is_read),
        }
    }
}
