//! Thread repository.

use sqlx::SqlitePool;

use super::thread::{normalize_thread_name, Thread, GENERAL_THREAD};
use crate::{FoundationError, Result};

/// Repository for threads.
pub struct ThreadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ThreadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a thread unless one with the same name (case-insensitive)
    /// exists, and return it. A blank name means "General".
    pub async fn upsert(&self, name: &str) -> Result<Thread> {
        let name = normalize_thread_name(name);
        sqlx::query("INSERT INTO threads (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(self.pool)
            .await?;

        self.get_by_name(name)
            .await?
            .ok_or_else(|| FoundationError::NotFound(format!("thread {name}")))
    }

    /// Look a thread up by name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>(
            "SELECT id, name, created_at FROM threads WHERE name = ? COLLATE NOCASE",
        )
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(thread)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Thread>> {
        let thread =
            sqlx::query_as::<_, Thread>("SELECT id, name, created_at FROM threads WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(thread)
    }

    /// Id of the "General" thread, recreating it if it went missing.
    pub async fn general_id(&self) -> Result<i64> {
        Ok(self.upsert(GENERAL_THREAD).await?.id)
    }

    /// All threads in creation order, so "General" comes first.
    pub async fn list(&self) -> Result<Vec<Thread>> {
        let threads =
            sqlx::query_as::<_, Thread>("SELECT id, name, created_at FROM threads ORDER BY id")
                .fetch_all(self.pool)
                .await?;
        Ok(threads)
    }
}
