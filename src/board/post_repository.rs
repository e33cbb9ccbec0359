//! Post repository.
//!
//! Authors can only change their own posts; deleting a post blanks its
//! content but keeps the row so replies stay attached.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::post::{NewPost, Post, PostQuery, PostSummary, ReadFilter, DELETED_POST_CONTENT};
use super::thread::normalize_thread_name;
use super::thread_repository::ThreadRepository;
use crate::{FoundationError, Result};

const POST_COLUMNS: &str = "p.id, p.author, p.thread_id, t.name AS thread, p.title, p.kind, \
     p.content, p.is_private, p.is_anonymous, p.created_at, p.updated_at, p.deleted, p.deleted_at";

/// Reject a blank author name.
pub(crate) fn require_author(author: &str) -> Result<&str> {
    let author = author.trim();
    if author.is_empty() {
        return Err(FoundationError::Validation("Missing author".to_string()));
    }
    Ok(author)
}

/// Whose eyes a listing is for.
#[derive(Debug, Clone, Copy)]
pub struct Audience<'v> {
    pub username: &'v str,
    /// Staff see other people's private posts.
    pub sees_private: bool,
}

/// Repository for posts.
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a post. A blank thread files it under "General"; any other
    /// thread must already exist.
    pub async fn create(&self, new_post: &NewPost) -> Result<Post> {
        let author = require_author(&new_post.author)?;
        let thread_name = normalize_thread_name(&new_post.thread);
        let thread = ThreadRepository::new(self.pool)
            .get_by_name(thread_name)
            .await?
            .ok_or_else(|| {
                FoundationError::Validation(format!("thread \"{thread_name}\" does not exist"))
            })?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (author, thread_id, title, kind, content, is_private, is_anonymous)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(author)
        .bind(thread.id)
        .bind(new_post.title.trim())
        .bind(new_post.kind.as_str())
        .bind(new_post.content.trim())
        .bind(new_post.is_private)
        .bind(new_post.is_anonymous)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FoundationError::NotFound("post".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN threads t ON t.id = p.thread_id WHERE p.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Replace title and content of a non-deleted post owned by `author`.
    pub async fn update_by_author(
        &self,
        id: i64,
        author: &str,
        title: &str,
        content: &str,
    ) -> Result<Post> {
        let author = require_author(author)?;
        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, updated_at = datetime('now')
             WHERE id = ? AND author = ? COLLATE NOCASE AND deleted = 0",
        )
        .bind(title.trim())
        .bind(content.trim())
        .bind(id)
        .bind(author)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FoundationError::Permission(
                "You can only edit your own non-deleted post.".to_string(),
            ));
        }
        self.get_by_id(id)
            .await?
            .ok_or_else(|| FoundationError::NotFound("post".to_string()))
    }

    /// Soft-delete a non-deleted post owned by `author`.
    pub async fn soft_delete_by_author(&self, id: i64, author: &str) -> Result<()> {
        let author = require_author(author)?;
        let result = sqlx::query(
            "UPDATE posts SET deleted = 1, content = ?, deleted_at = datetime('now')
             WHERE id = ? AND author = ? COLLATE NOCASE AND deleted = 0",
        )
        .bind(DELETED_POST_CONTENT)
        .bind(id)
        .bind(author)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(FoundationError::Permission(
                "You can only delete your own non-deleted post.".to_string(),
            ));
        }
        Ok(())
    }

    /// One post with the audience's reply and read counters.
    pub async fn get_summary(&self, id: i64, audience: Audience<'_>) -> Result<Option<PostSummary>> {
        let mut query = summary_select(audience.username);
        query.push(" AND p.id = ").push_bind(id);
        let summary = query
            .build_query_as::<PostSummary>()
            .fetch_optional(self.pool)
            .await?;
        Ok(summary)
    }

    /// Search posts visible to `audience`, newest first.
    pub async fn search(&self, filter: &PostQuery, audience: Audience<'_>) -> Result<Vec<PostSummary>> {
        let mut query = summary_select(audience.username);

        if !audience.sees_private {
            query
                .push(" AND (p.is_private = 0 OR p.author = ")
                .push_bind(audience.username.to_string())
                .push(" COLLATE NOCASE)");
        }
        if !filter.include_deleted {
            query.push(" AND p.deleted = 0");
        }

        if let Some(keyword) = non_blank(&filter.keyword) {
            let pattern = format!("%{}%", escape_like(&keyword.to_lowercase()));
            query
                .push(" AND (LOWER(p.title) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(p.content) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(thread) = non_blank(&filter.thread) {
            if !thread.eq_ignore_ascii_case("all") {
                query
                    .push(" AND t.name = ")
                    .push_bind(thread.to_string())
                    .push(" COLLATE NOCASE");
            }
        }
        if let Some(author) = non_blank(&filter.author) {
            query
                .push(" AND p.author = ")
                .push_bind(author.to_string())
                .push(" COLLATE NOCASE");
            // Anonymous posts are only found by their own author.
            query
                .push(" AND (p.is_anonymous = 0 OR p.author = ")
                .push_bind(audience.username.to_string())
                .push(" COLLATE NOCASE)");
        }
        if let Some(kind) = filter.kind {
            query.push(" AND p.kind = ").push_bind(kind.as_str());
        }
        match filter.read {
            ReadFilter::Any => {}
            ReadFilter::Read => {
                query.push(" AND ");
                push_is_read(&mut query, audience.username);
            }
            ReadFilter::Unread => {
                query.push(" AND NOT ");
                push_is_read(&mut query, audience.username);
            }
        }

        query.push(" ORDER BY p.created_at DESC, p.id DESC");
        let posts = query
            .build_query_as::<PostSummary>()
            .fetch_all(self.pool)
            .await?;
        Ok(posts)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Escape LIKE wildcards so the keyword matches literally.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SELECT of post summaries for `username`, ending in an open WHERE clause.
fn summary_select(username: &str) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {POST_COLUMNS},
            (SELECT COUNT(*) FROM replies r WHERE r.post_id = p.id) AS reply_count,
            (SELECT COUNT(*) FROM replies r
               LEFT JOIN reply_reads rr ON rr.reply_id = r.id AND rr.user_name = "
    ));
    query
        .push_bind(username.to_string())
        .push(" WHERE r.post_id = p.id AND rr.reply_id IS NULL) AS unread_reply_count, ");
    push_is_read(&mut query, username);
    query.push(" AS is_read FROM posts p JOIN threads t ON t.id = p.thread_id WHERE 1 = 1");
    query
}

fn push_is_read(query: &mut QueryBuilder<'static, Sqlite>, username: &str) {
    query
        .push("EXISTS(SELECT 1 FROM post_reads pr WHERE pr.post_id = p.id AND pr.user_name = ")
        .push_bind(username.to_string())
        .push(")");
}
