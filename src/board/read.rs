//! Per-user read tracking for posts and replies.

use serde::Serialize;
use sqlx::SqlitePool;

use super::reply::display_author;
use crate::Result;

/// Which replies to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyFilter {
    #[default]
    All,
    /// Only replies the user has not marked read.
    Unread,
}

impl ReplyFilter {
    /// "unread" in any case selects `Unread`; anything else is `All`.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("unread") {
            ReplyFilter::Unread
        } else {
            ReplyFilter::All
        }
    }
}

/// A reply together with whether the user has read it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReplyView {
    pub id: i64,
    pub post_id: i64,
    pub author: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_read: bool,
}

impl ReplyView {
    pub fn display_author(&self) -> &str {
        display_author(self.author.as_deref())
    }

    /// One-line rendering: `author: content`.
    pub fn summary_line(&self) -> String {
        format!("{}: {}", self.display_author(), self.content)
    }
}

/// Repository for read markers.
pub struct ReadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn is_post_read(&self, user: &str, post_id: i64) -> Result<bool> {
        let read: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM post_reads WHERE user_name = ? AND post_id = ?)",
        )
        .bind(user)
        .bind(post_id)
        .fetch_one(self.pool)
        .await?;
        Ok(read)
    }

    /// Mark a post read or unread.
    pub async fn set_post_read(&self, user: &str, post_id: i64, read: bool) -> Result<()> {
        if read {
            self.mark_post_viewed(user, post_id).await
        } else {
            sqlx::query("DELETE FROM post_reads WHERE user_name = ? AND post_id = ?")
                .bind(user)
                .bind(post_id)
                .execute(self.pool)
                .await?;
            Ok(())
        }
    }

    /// Record that `user` opened a post, refreshing the timestamp.
    pub async fn mark_post_viewed(&self, user: &str, post_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO post_reads (user_name, post_id) VALUES (?, ?)
             ON CONFLICT(user_name, post_id) DO UPDATE SET last_read_at = datetime('now')",
        )
        .bind(user)
        .bind(post_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_reply_read(&self, user: &str, reply_id: i64) -> Result<bool> {
        let read: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reply_reads WHERE user_name = ? AND reply_id = ?)",
        )
        .bind(user)
        .bind(reply_id)
        .fetch_one(self.pool)
        .await?;
        Ok(read)
    }

    /// Mark a reply read or unread.
    pub async fn set_reply_read(&self, user: &str, reply_id: i64, read: bool) -> Result<()> {
        let sql = if read {
            "INSERT INTO reply_reads (user_name, reply_id) VALUES (?, ?)
             ON CONFLICT(user_name, reply_id) DO UPDATE SET read_at = datetime('now')"
        } else {
            "DELETE FROM reply_reads WHERE user_name = ? AND reply_id = ?"
        };
        sqlx::query(sql)
            .bind(user)
            .bind(reply_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Replies to a post that `user` has not marked read.
    pub async fn unread_reply_count(&self, user: &str, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM replies r
             LEFT JOIN reply_reads rr ON rr.reply_id = r.id AND rr.user_name = ?
             WHERE r.post_id = ? AND rr.reply_id IS NULL",
        )
        .bind(user)
        .bind(post_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Replies to a post, oldest first, with `user`'s read state.
    pub async fn list_replies(
        &self,
        post_id: i64,
        filter: ReplyFilter,
        user: &str,
    ) -> Result<Vec<ReplyView>> {
        let unread_only = match filter {
            ReplyFilter::All => "",
            ReplyFilter::Unread => " AND rr.reply_id IS NULL",
        };
        let sql = format!(
            "SELECT r.id, r.post_id, r.author, r.content, r.created_at, r.updated_at,
                    rr.reply_id IS NOT NULL AS is_read
             FROM replies r
             LEFT JOIN reply_reads rr ON rr.reply_id = r.id AND rr.user_name = ?
             WHERE r.post_id = ?{unread_only}
             ORDER BY r.created_at, r.id"
        );
        let replies = sqlx::query_as::<_, ReplyView>(&sql)
            .bind(user)
            .bind(post_id)
            .fetch_all(self.pool)
            .await?;
        Ok(replies)
    }
}
