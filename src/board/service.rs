//! Board service.
//!
//! High-level operations for threads, posts and replies with content
//! validation, private-post visibility and anonymous display built in.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::validation::validate_content;
use crate::datetime::humanize_since;
use crate::db::{Database, Role};
use crate::{FoundationError, Result};

use super::post::{NewPost, Post, PostKind, PostQuery, PostSummary};
use super::post_repository::{Audience, PostRepository};
use super::read::{ReadRepository, ReplyFilter, ReplyView};
use super::reply::{Reply, ReplyRepository, ANONYMOUS};
use super::thread::{Thread, MAX_THREAD_NAME_LENGTH};
use super::thread_repository::ThreadRepository;

/// Maximum length for post titles (in characters).
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for post and reply bodies (in characters).
pub const MAX_BODY_LENGTH: usize = 10_000;

fn validate_length(field: &str, text: &str, max: usize) -> Result<()> {
    if text.trim().chars().count() > max {
        return Err(FoundationError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn validate_post_text(title: &str, body: &str) -> Result<()> {
    validate_content("Title", title)?;
    validate_content("Body", body)?;
    validate_length("Title", title, MAX_TITLE_LENGTH)?;
    validate_length("Body", body, MAX_BODY_LENGTH)
}

fn validate_reply_text(content: &str) -> Result<()> {
    validate_content("Reply", content)?;
    validate_length("Reply", content, MAX_BODY_LENGTH)
}

/// The signed-in user a board operation is performed for.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub username: String,
    /// Role chosen at login.
    pub role: Role,
}

impl Viewer {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    fn audience(&self) -> Audience<'_> {
        Audience {
            username: &self.username,
            sees_private: self.role.is_staff(),
        }
    }

    /// Whether this viewer may see `post`.
    pub fn can_see(&self, post: &Post) -> bool {
        !post.is_private || self.role.is_staff() || post.is_authored_by(&self.username)
    }
}

/// A post as presented to one viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub thread: String,
    pub title: String,
    pub kind: PostKind,
    pub content: String,
    /// Real author; hidden on other people's anonymous posts.
    pub author: Option<String>,
    pub display_author: String,
    pub is_own: bool,
    pub is_private: bool,
    pub is_anonymous: bool,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
    /// Relative age such as "3h ago".
    pub age: String,
    pub reply_count: i64,
    pub unread_reply_count: i64,
    pub is_read: bool,
}

impl PostView {
    pub fn new(summary: PostSummary, viewer: &Viewer) -> Self {
        let post = summary.post;
        let is_own = post.is_authored_by(&viewer.username);
        let author = (is_own || !post.is_anonymous).then(|| post.author.clone());
        let display_author = if post.is_anonymous && !is_own {
            ANONYMOUS.to_string()
        } else {
            post.author.clone()
        };

        Self {
            id: post.id,
            kind: post.kind(),
            age: humanize_since(&post.created_at, Utc::now()),
            thread: post.thread,
            title: post.title,
            content: post.content,
            author,
            display_author,
            is_own,
            is_private: post.is_private,
            is_anonymous: post.is_anonymous,
            deleted: post.deleted,
            created_at: post.created_at,
            updated_at: post.updated_at,
            deleted_at: post.deleted_at,
            reply_count: summary.reply_count,
            unread_reply_count: summary.unread_reply_count,
            is_read: summary.is_read,
        }
    }
}

/// Service for board operations.
pub struct BoardService<'a> {
    db: &'a Database,
}

impl<'a> BoardService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn posts(&self) -> PostRepository<'_> {
        PostRepository::new(self.db.pool())
    }

    fn replies(&self) -> ReplyRepository<'_> {
        ReplyRepository::new(self.db.pool())
    }

    fn reads(&self) -> ReadRepository<'_> {
        ReadRepository::new(self.db.pool())
    }

    /// Fetch a post the viewer may see. Invisible posts are reported as
    /// missing.
    async fn visible_post(&self, viewer: &Viewer, post_id: i64) -> Result<Post> {
        match self.posts().get_by_id(post_id).await? {
            Some(post) if viewer.can_see(&post) => Ok(post),
            _ => Err(FoundationError::NotFound("post".to_string())),
        }
    }

    async fn view(&self, viewer: &Viewer, post_id: i64) -> Result<PostView> {
        let summary = self
            .posts()
            .get_summary(post_id, viewer.audience())
            .await?
            .ok_or_else(|| FoundationError::NotFound("post".to_string()))?;
        Ok(PostView::new(summary, viewer))
    }

    // --- threads ---

    pub async fn list_threads(&self) -> Result<Vec<Thread>> {
        ThreadRepository::new(self.db.pool()).list().await
    }

    /// Create a thread, or return the existing one with that name. Staff only.
    pub async fn create_thread(&self, viewer: &Viewer, name: &str) -> Result<Thread> {
        if !viewer.role.is_staff() {
            return Err(FoundationError::Permission(
                "only staff can create threads".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(FoundationError::Validation(
                "thread name must not be empty".to_string(),
            ));
        }
        validate_length("Thread name", name, MAX_THREAD_NAME_LENGTH)?;

        let thread = ThreadRepository::new(self.db.pool()).upsert(name).await?;
        info!(username = %viewer.username, thread = %thread.name, "Thread created");
        Ok(thread)
    }

    // --- posts ---

    /// Create a post authored by the viewer.
    pub async fn create_post(&self, viewer: &Viewer, mut new_post: NewPost) -> Result<PostView> {
        validate_post_text(&new_post.title, &new_post.content)?;
        new_post.author = viewer.username.clone();

        let post = self.posts().create(&new_post).await?;
        info!(
            username = %viewer.username,
            post_id = post.id,
            thread = %post.thread,
            "Post created"
        );
        self.view(viewer, post.id).await
    }

    /// Open a post and mark it read for the viewer.
    pub async fn view_post(&self, viewer: &Viewer, post_id: i64) -> Result<PostView> {
        let post = self.visible_post(viewer, post_id).await?;
        self.reads().mark_post_viewed(&viewer.username, post.id).await?;
        self.view(viewer, post.id).await
    }

    /// Search posts. Deleted posts are only included when asked for.
    pub async fn search_posts(&self, viewer: &Viewer, query: &PostQuery) -> Result<Vec<PostView>> {
        let summaries = self.posts().search(query, viewer.audience()).await?;
        debug!(username = %viewer.username, results = summaries.len(), "Post search");
        Ok(summaries
            .into_iter()
            .map(|summary| PostView::new(summary, viewer))
            .collect())
    }

    /// The viewer's own posts, deleted ones included.
    pub async fn list_my_posts(&self, viewer: &Viewer, query: &PostQuery) -> Result<Vec<PostView>> {
        let query = query
            .clone()
            .author(viewer.username.clone())
            .include_deleted(true);
        self.search_posts(viewer, &query).await
    }

    pub async fn update_post(
        &self,
        viewer: &Viewer,
        post_id: i64,
        title: &str,
        content: &str,
    ) -> Result<PostView> {
        validate_post_text(title, content)?;
        self.posts()
            .update_by_author(post_id, &viewer.username, title, content)
            .await?;
        info!(username = %viewer.username, post_id, "Post updated");
        self.view(viewer, post_id).await
    }

    /// Soft-delete one of the viewer's posts; replies are kept.
    pub async fn delete_post(&self, viewer: &Viewer, post_id: i64) -> Result<()> {
        self.posts()
            .soft_delete_by_author(post_id, &viewer.username)
            .await?;
        info!(username = %viewer.username, post_id, "Post deleted");
        Ok(())
    }

    pub async fn set_post_read(&self, viewer: &Viewer, post_id: i64, read: bool) -> Result<()> {
        let post = self.visible_post(viewer, post_id).await?;
        self.reads()
            .set_post_read(&viewer.username, post.id, read)
            .await
    }

    // --- replies ---

    /// Reply to a visible, non-deleted post.
    pub async fn add_reply(&self, viewer: &Viewer, post_id: i64, content: &str) -> Result<Reply> {
        let post = self.visible_post(viewer, post_id).await?;
        if post.deleted {
            return Err(FoundationError::Validation(
                "Cannot reply to a deleted post.".to_string(),
            ));
        }
        validate_reply_text(content)?;

        let reply = self
            .replies()
            .create(post.id, &viewer.username, content)
            .await?;
        info!(username = %viewer.username, post_id, reply_id = reply.id, "Reply added");
        Ok(reply)
    }

    pub async fn list_replies(
        &self,
        viewer: &Viewer,
        post_id: i64,
        filter: ReplyFilter,
    ) -> Result<Vec<ReplyView>> {
        let post = self.visible_post(viewer, post_id).await?;
        self.reads()
            .list_replies(post.id, filter, &viewer.username)
            .await
    }

    pub async fn update_reply(&self, viewer: &Viewer, reply_id: i64, content: &str) -> Result<Reply> {
        validate_reply_text(content)?;
        let reply = self
            .replies()
            .update_by_author(reply_id, &viewer.username, content)
            .await?;
        info!(username = %viewer.username, reply_id, "Reply updated");
        Ok(reply)
    }

    pub async fn delete_reply(&self, viewer: &Viewer, reply_id: i64) -> Result<()> {
        self.replies()
            .delete_by_author(reply_id, &viewer.username)
            .await?;
        info!(username = %viewer.username, reply_id, "Reply deleted");
        Ok(())
    }

    pub async fn set_reply_read(&self, viewer: &Viewer, reply_id: i64, read: bool) -> Result<()> {
        let reply = self
            .replies()
            .get_by_id(reply_id)
            .await?
            .ok_or_else(|| FoundationError::NotFound("reply".to_string()))?;
        self.visible_post(viewer, reply.post_id).await?;
        self.reads()
            .set_reply_read(&viewer.username, reply.id, read)
            .await
    }
}
