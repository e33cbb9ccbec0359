//! Database module for Foundation.
//!
//! SQLite connectivity through a sqlx pool, migration management and the
//! account repositories.

mod invitation;
mod one_time_password;
mod repository;
mod schema;
mod user;

pub(crate) use invitation::claim_invitation;
pub use invitation::{InvitationCode, InvitationRepository, INVITATION_CODE_LENGTH};
pub use one_time_password::{OneTimePassword, OneTimePasswordRepository, ONE_TIME_PASSWORD_LENGTH};
pub(crate) use repository::insert_user;
pub use repository::UserRepository;
pub use schema::MIGRATIONS;
pub use user::{NewUser, Role, RoleSet, User, UserUpdate};

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::{FoundationError, Result};

/// Database handle wrapping a SQLite connection pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database at the specified path, creating it if needed.
    ///
    /// Migrations are applied automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| FoundationError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// Uses a single connection that is never recycled, since every SQLite
    /// in-memory connection is a separate database.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| FoundationError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the current schema version (0 for a fresh database).
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations, each in its own transaction.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version    INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        let current = self.schema_version().await?;
        let target = MIGRATIONS.len() as i64;
        if current >= target {
            debug!("Database schema is up to date (version {})", current);
            return Ok(());
        }

        info!("Migrating database from version {} to {}", current, target);
        for (index, migration) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = index as i64 + 1;
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await.map_err(|e| {
                FoundationError::Database(format!("migration v{version} failed: {e}"))
            })?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            debug!("Applied migration v{}", version);
        }

        Ok(())
    }

    /// Check whether a table exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether no user accounts exist yet.
    ///
    /// A failing query is treated as empty so that first-run setup is offered.
    pub async fn is_empty(&self) -> bool {
        match UserRepository::new(&self.pool).count().await {
            Ok(count) => count == 0,
            Err(e) => {
                warn!(error = %e, "Could not count users; treating database as empty");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_applies_migrations() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), MIGRATIONS.len() as i64);

        for table in [
            "users",
            "invitation_codes",
            "one_time_passwords",
            "threads",
            "posts",
            "replies",
            "post_reads",
            "reply_reads",
        ] {
            assert!(db.table_exists(table).await.unwrap(), "missing {table}");
        }
        assert!(!db.table_exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_general_thread_exists_after_migration() {
        let db = Database::open_in_memory().await.unwrap();
        let name: String = sqlx::query_scalar("SELECT name FROM threads WHERE id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(name, "General");
    }

    #[tokio::test]
    async fn test_is_empty() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.is_empty().await);

        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("firstadmin", "hash").with_role(Role::Admin))
            .await
            .unwrap();
        assert!(!db.is_empty().await);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("board.db");

        {
            let db = Database::open(&path).await.unwrap();
            let repo = UserRepository::new(db.pool());
            repo.create(&NewUser::new("persisted", "hash")).await.unwrap();
            db.close().await;
        }

        assert!(path.exists());
        let db = Database::open(&path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), MIGRATIONS.len() as i64);
        let repo = UserRepository::new(db.pool());
        assert!(repo.username_exists("persisted").await.unwrap());
    }
}
