//! Discussion board handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::board::{BoardService, PostView, Thread, Viewer};
use crate::web::dto::{
    ApiResponse, CreatePostRequest, CreateThreadRequest, MessageResponse, PostListQuery,
    PostResponse, ReadStateRequest, ReplyListQuery, ReplyRequest, ReplyResponse,
    UpdatePostRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JwtClaims};

/// Board viewer for a token whose account still holds the acting role.
async fn viewer(state: &AppState, claims: &JwtClaims) -> Result<Viewer, ApiError> {
    let user = state.current_user(claims).await?;
    Ok(Viewer::new(user.username, claims.role))
}

fn posts_response(state: &AppState, posts: Vec<PostView>) -> Vec<PostResponse> {
    posts
        .into_iter()
        .map(|post| PostResponse::new(post, &state.timezone))
        .collect()
}

// --- threads ---

/// GET /api/threads
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<Thread>>>, ApiError> {
    viewer(&state, &claims).await?;
    let threads = BoardService::new(&state.db).list_threads().await?;
    Ok(Json(ApiResponse::new(threads)))
}

/// POST /api/threads - Staff only.
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateThreadRequest>,
) -> Result<Json<ApiResponse<Thread>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let thread = BoardService::new(&state.db)
        .create_thread(&viewer, &req.name)
        .await?;
    Ok(Json(ApiResponse::new(thread)))
}

// --- posts ---

/// GET /api/posts - Deleted posts are skipped unless `include_deleted=true`.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<PostListQuery>,
) -> Result<Json<ApiResponse<Vec<PostResponse>>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let posts = BoardService::new(&state.db)
        .search_posts(&viewer, &query.to_post_query()?)
        .await?;
    Ok(Json(ApiResponse::new(posts_response(&state, posts))))
}

/// GET /api/posts/mine - The caller's posts, deleted ones included.
pub async fn list_my_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Query(query): Query<PostListQuery>,
) -> Result<Json<ApiResponse<Vec<PostResponse>>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let posts = BoardService::new(&state.db)
        .list_my_posts(&viewer, &query.to_post_query()?)
        .await?;
    Ok(Json(ApiResponse::new(posts_response(&state, posts))))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let post = BoardService::new(&state.db)
        .create_post(&viewer, req.into_new_post()?)
        .await?;
    Ok(Json(ApiResponse::new(PostResponse::new(post, &state.timezone))))
}

/// GET /api/posts/:id - Also marks the post read.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let post = BoardService::new(&state.db).view_post(&viewer, post_id).await?;
    Ok(Json(ApiResponse::new(PostResponse::new(post, &state.timezone))))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let post = BoardService::new(&state.db)
        .update_post(&viewer, post_id, &req.title, &req.content)
        .await?;
    Ok(Json(ApiResponse::new(PostResponse::new(post, &state.timezone))))
}

/// DELETE /api/posts/:id - Soft delete; replies stay attached.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    BoardService::new(&state.db)
        .delete_post(&viewer, post_id)
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Post deleted."))))
}

/// PUT /api/posts/:id/read
pub async fn set_post_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReadStateRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    BoardService::new(&state.db)
        .set_post_read(&viewer, post_id, req.read)
        .await?;
    let message = if req.read { "Marked read." } else { "Marked unread." };
    Ok(Json(ApiResponse::new(MessageResponse::new(message))))
}

// --- replies ---

/// GET /api/posts/:id/replies
pub async fn list_replies(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
    Query(query): Query<ReplyListQuery>,
) -> Result<Json<ApiResponse<Vec<ReplyResponse>>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let replies = BoardService::new(&state.db)
        .list_replies(&viewer, post_id, query.filter())
        .await?
        .into_iter()
        .map(|reply| ReplyResponse::from_view(reply, &state.timezone))
        .collect();
    Ok(Json(ApiResponse::new(replies)))
}

/// POST /api/posts/:id/replies
pub async fn create_reply(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(post_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReplyRequest>,
) -> Result<Json<ApiResponse<ReplyResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let reply = BoardService::new(&state.db)
        .add_reply(&viewer, post_id, &req.content)
        .await?;
    Ok(Json(ApiResponse::new(ReplyResponse::from_reply(
        reply,
        &state.timezone,
    ))))
}

/// PUT /api/replies/:id
pub async fn update_reply(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(reply_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReplyRequest>,
) -> Result<Json<ApiResponse<ReplyResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    let reply = BoardService::new(&state.db)
        .update_reply(&viewer, reply_id, &req.content)
        .await?;
    Ok(Json(ApiResponse::new(ReplyResponse::from_reply(
        reply,
        &state.timezone,
    ))))
}

/// DELETE /api/replies/:id
pub async fn delete_reply(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(reply_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    BoardService::new(&state.db)
        .delete_reply(&viewer, reply_id)
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new("Reply deleted."))))
}

/// PUT /api/replies/:id/read
pub async fn set_reply_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(reply_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReadStateRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let viewer = viewer(&state, &claims).await?;
    BoardService::new(&state.db)
        .set_reply_read(&viewer, reply_id, req.read)
        .await?;
    let message = if req.read { "Marked read." } else { "Marked unread." };
    Ok(Json(ApiResponse::new(MessageResponse::new(message))))
}
