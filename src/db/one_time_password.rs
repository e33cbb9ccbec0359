//! One-time password repository.
//!
//! An administrator issues a one-time password for an account's email
//! address; the owner redeems it once to set a new password.

use sqlx::SqlitePool;
use tracing::debug;

use super::invitation::generate_short_code;
use crate::{FoundationError, Result};

/// Length of a generated one-time password.
pub const ONE_TIME_PASSWORD_LENGTH: usize = 6;

const MAX_CODE_ATTEMPTS: usize = 5;

/// A stored one-time password.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OneTimePassword {
    pub code: String,
    pub email: String,
    pub used: bool,
    pub expires_at: String,
    pub created_at: String,
    pub used_at: Option<String>,
}

/// Repository for one-time passwords.
pub struct OneTimePasswordRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OneTimePasswordRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate and store a one-time password for `email`.
    pub async fn create(&self, email: &str, expires_at: &str) -> Result<OneTimePassword> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_short_code(ONE_TIME_PASSWORD_LENGTH);
            let inserted = sqlx::query_as::<_, OneTimePassword>(
                "INSERT INTO one_time_passwords (code, email, expires_at)
                 VALUES (?, ?, ?)
                 RETURNING code, email, used, expires_at, created_at, used_at",
            )
            .bind(&code)
            .bind(email)
            .bind(expires_at)
            .fetch_one(self.pool)
            .await;

            match inserted {
                Ok(otp) => return Ok(otp),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    debug!("One-time password collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FoundationError::Database(
            "could not generate a unique one-time password".to_string(),
        ))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<OneTimePassword>> {
        let otp = sqlx::query_as::<_, OneTimePassword>(
            "SELECT code, email, used, expires_at, created_at, used_at
             FROM one_time_passwords WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(otp)
    }

    /// Atomically mark an unused, unexpired code issued to `email` as used.
    ///
    /// Returns None if the code does not match, was already used, or expired.
    pub async fn consume(&self, email: &str, code: &str) -> Result<Option<OneTimePassword>> {
        let otp = sqlx::query_as::<_, OneTimePassword>(
            "UPDATE one_time_passwords
             SET used = 1, used_at = datetime('now')
             WHERE code = ? AND email = ? COLLATE NOCASE
               AND used = 0 AND expires_at > datetime('now')
             RETURNING code, email, used, expires_at, created_at, used_at",
        )
        .bind(code)
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(otp)
    }

    /// Delete used and expired one-time passwords.
    pub async fn cleanup(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM one_time_passwords WHERE used = 1 OR expires_at <= datetime('now')",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::minutes_from_now;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimePasswordRepository::new(db.pool());

        let otp = repo
            .create("phil@example.com", &minutes_from_now(60))
            .await
            .unwrap();
        assert_eq!(otp.code.len(), ONE_TIME_PASSWORD_LENGTH);
        assert!(!otp.used);
        assert!(otp.used_at.is_none());

        let fetched = repo.get_by_code(&otp.code).await.unwrap().unwrap();
        assert_eq!(fetched.email, "phil@example.com");
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimePasswordRepository::new(db.pool());
        let otp = repo
            .create("phil@example.com", &minutes_from_now(60))
            .await
            .unwrap();

        let consumed = repo
            .consume("PHIL@example.com", &otp.code)
            .await
            .unwrap()
            .unwrap();
        assert!(consumed.used);
        assert!(consumed.used_at.is_some());

        assert!(repo
            .consume("phil@example.com", &otp.code)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_consume_rejects_wrong_email_and_expired() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimePasswordRepository::new(db.pool());

        let otp = repo
            .create("phil@example.com", &minutes_from_now(60))
            .await
            .unwrap();
        assert!(repo
            .consume("other@example.com", &otp.code)
            .await
            .unwrap()
            .is_none());

        let expired = repo
            .create("phil@example.com", &minutes_from_now(-5))
            .await
            .unwrap();
        assert!(repo
            .consume("phil@example.com", &expired.code)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cleanup() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = OneTimePasswordRepository::new(db.pool());

        let used = repo.create("a@example.com", &minutes_from_now(60)).await.unwrap();
        repo.consume("a@example.com", &used.code).await.unwrap();
        repo.create("b@example.com", &minutes_from_now(-1)).await.unwrap();
        let live = repo.create("c@example.com", &minutes_from_now(60)).await.unwrap();

        assert_eq!(repo.cleanup().await.unwrap(), 2);
        assert!(repo.get_by_code(&live.code).await.unwrap().is_some());
    }
}
