//! Replies to posts.

use serde::Serialize;
use sqlx::SqlitePool;

use super::post_repository::require_author;
use crate::{FoundationError, Result};

/// Name shown for replies without an author.
pub const ANONYMOUS: &str = "Anonymous";

/// A stored reply.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reply {
    pub id: i64,
    pub post_id: i64,
    pub author: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Reply {
    pub fn display_author(&self) -> &str {
        display_author(self.author.as_deref())
    }
}

/// Blank or missing authors display as "Anonymous".
pub fn display_author(author: Option<&str>) -> &str {
    match author.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => ANONYMOUS,
    }
}

const REPLY_COLUMNS: &str = "id, post_id, author, content, created_at, updated_at";

/// Repository for replies.
pub struct ReplyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReplyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, post_id: i64, author: &str, content: &str) -> Result<Reply> {
        let author = require_author(author)?;
        let reply = sqlx::query_as::<_, Reply>(&format!(
            "INSERT INTO replies (post_id, author, content) VALUES (?, ?, ?)
             RETURNING {REPLY_COLUMNS}"
        ))
        .bind(post_id)
        .bind(author)
        .bind(content.trim())
        .fetch_one(self.pool)
        .await?;
        Ok(reply)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Reply>> {
        let reply =
            sqlx::query_as::<_, Reply>(&format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(reply)
    }

    /// Replies to a post, oldest first.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Reply>> {
        let replies = sqlx::query_as::<_, Reply>(&format!(
            "SELECT {REPLY_COLUMNS} FROM replies WHERE post_id = ? ORDER BY created_at, id"
        ))
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;
        Ok(replies)
    }

    /// Replace the content of a reply written by `author`.
    pub async fn update_by_author(&self, id: i64, author: &str, content: &str) -> Result<Reply> {
        let author = require_author(author)?;
        let reply = sqlx::query_as::<_, Reply>(&format!(
            "UPDATE replies SET content = ?, updated_at = datetime('now')
             WHERE id = ? AND author = ? COLLATE NOCASE
             RETURNING {REPLY_COLUMNS}"
        ))
        .bind(content.trim())
        .bind(id)
        .bind(author)
        .fetch_optional(self.pool)
        .await?;

        reply.ok_or_else(|| {
            FoundationError::Permission("You can only edit your own reply.".to_string())
        })
    }

    /// Delete a reply written by `author`.
    pub async fn delete_by_author(&self, id: i64, author: &str) -> Result<()> {
        let author = require_author(author)?;
        let result = sqlx::query("DELETE FROM replies WHERE id = ? AND author = ? COLLATE NOCASE")
            .bind(id)
            .bind(author)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FoundationError::Permission(
                "You can only delete your own reply.".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{NewPost, PostRepository};
    use crate::db::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let post = PostRepository::new(db.pool())
            .create(&NewPost::new("student1", "Title", "Body"))
            .await
            .unwrap();
        (db, post.id)
    }

    #[test]
    fn test_display_author() {
        assert_eq!(display_author(Some("student1")), "student1");
        assert_eq!(display_author(Some("  ")), "Anonymous");
        assert_eq!(display_author(None), "Anonymous");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (db, post_id) = setup().await;
        let repo = ReplyRepository::new(db.pool());

        let first = repo.create(post_id, "student2", " First! ").await.unwrap();
        let second = repo.create(post_id, "student3", "Second").await.unwrap();
        assert_eq!(first.content, "First!");
        assert_eq!(first.display_author(), "student2");

        let replies = repo.list_for_post(post_id).await.unwrap();
        let ids: Vec<i64> = replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(repo.count_for_post(post_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_author() {
        let (db, post_id) = setup().await;
        let repo = ReplyRepository::new(db.pool());
        let reply = repo.create(post_id, "student2", "Draft").await.unwrap();

        match repo.update_by_author(reply.id, "student3", "Hijack").await {
            Err(FoundationError::Permission(message)) => {
                assert_eq!(message, "You can only edit your own reply.")
            }
            other => panic!("expected permission error, got {other:?}"),
        }
        let updated = repo
            .update_by_author(reply.id, "student2", "Final")
            .await
            .unwrap();
        assert_eq!(updated.content, "Final");
        assert!(updated.updated_at.is_some());

        match repo.delete_by_author(reply.id, "student3").await {
            Err(FoundationError::Permission(message)) => {
                assert_eq!(message, "You can only delete your own reply.")
            }
            other => panic!("expected permission error, got {other:?}"),
        }
        repo.delete_by_author(reply.id, "student2").await.unwrap();
        assert!(repo.get_by_id(reply.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_author() {
        let (db, post_id) = setup().await;
        let repo = ReplyRepository::new(db.pool());
        assert!(matches!(
            repo.create(post_id, "", "Hello there").await,
            Err(FoundationError::Validation(_))
        ));
        assert!(matches!(
            repo.delete_by_author(1, " ").await,
            Err(FoundationError::Validation(_))
        ));
    }
}
