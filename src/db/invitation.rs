//! Invitation code repository.
//!
//! An invitation lets one email address create one account with a
//! pre-assigned role before its deadline passes.

use sqlx::SqlitePool;
use tracing::debug;

use super::user::Role;
use crate::{FoundationError, Result};

/// Length of a generated invitation code.
pub const INVITATION_CODE_LENGTH: usize = 6;

const MAX_CODE_ATTEMPTS: usize = 5;

/// A stored invitation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvitationCode {
    pub code: String,
    pub email: String,
    role: String,
    /// UTC deadline, `YYYY-MM-DD HH:MM:SS`.
    pub deadline: String,
    pub created_at: String,
}

impl InvitationCode {
    /// The role the invited account will receive.
    pub fn role(&self) -> Result<Role> {
        self.role
            .parse()
            .map_err(|e: String| FoundationError::Database(format!("corrupt invitation role: {e}")))
    }
}

/// Short code taken from a random v4 UUID.
pub(crate) fn generate_short_code(len: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string()[..len].to_string()
}

/// Repository for invitation codes.
pub struct InvitationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InvitationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new invitation and return it. The code is regenerated if it
    /// collides with an existing one.
    pub async fn create(&self, email: &str, role: Role, deadline: &str) -> Result<InvitationCode> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_short_code(INVITATION_CODE_LENGTH);
            let inserted = sqlx::query_as::<_, InvitationCode>(
                "INSERT INTO invitation_codes (code, email, role, deadline)
                 VALUES (?, ?, ?, ?)
                 RETURNING code, email, role, deadline, created_at",
            )
            .bind(&code)
            .bind(email)
            .bind(role.as_str())
            .bind(deadline)
            .fetch_one(self.pool)
            .await;

            match inserted {
                Ok(invitation) => return Ok(invitation),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    debug!(code = %code, "Invitation code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FoundationError::Database(
            "could not generate a unique invitation code".to_string(),
        ))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<InvitationCode>> {
        let invitation = sqlx::query_as::<_, InvitationCode>(
            "SELECT code, email, role, deadline, created_at FROM invitation_codes WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(invitation)
    }

    /// Whether the code exists and its deadline has not passed.
    pub async fn is_valid(&self, code: &str) -> Result<bool> {
        let valid: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM invitation_codes
                           WHERE code = ? AND deadline > datetime('now'))",
        )
        .bind(code)
        .fetch_one(self.pool)
        .await?;
        Ok(valid)
    }

    /// The role attached to a code, if the code exists.
    pub async fn role_for_code(&self, code: &str) -> Result<Option<Role>> {
        match self.get_by_code(code).await? {
            Some(invitation) => Ok(Some(invitation.role()?)),
            None => Ok(None),
        }
    }

    /// The email address attached to a code, if the code exists.
    pub async fn email_for_code(&self, code: &str) -> Result<Option<String>> {
        let email: Option<String> = sqlx::query_scalar("SELECT email FROM invitation_codes WHERE code = ?")
            .bind(code)
            .fetch_optional(self.pool)
            .await?;
        Ok(email)
    }

    /// Whether an invitation is outstanding for this address (case-insensitive).
    pub async fn email_has_been_used(&self, email: &str) -> Result<bool> {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM invitation_codes WHERE email = ? COLLATE NOCASE)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(used)
    }

    /// Delete every invitation sent to `email`. Returns the number removed.
    pub async fn clear_for_email(&self, email: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM invitation_codes WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove a code once it has been used. Returns false if it did not exist.
    pub async fn remove(&self, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invitation_codes WHERE code = ?")
            .bind(code)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove invitations whose deadline has passed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM invitation_codes WHERE deadline <= datetime('now')")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invitation_codes")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Delete an unexpired invitation and return it.
///
/// Only one caller can claim a given code; run it inside the transaction
/// that creates the account so a failed registration gives the code back.
pub(crate) async fn claim_invitation<'e, E>(executor: E, code: &str) -> Result<Option<InvitationCode>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let invitation = sqlx::query_as::<_, InvitationCode>(
        "DELETE FROM invitation_codes
         WHERE code = ? AND deadline > datetime('now')
         RETURNING code, email, role, deadline, created_at",
    )
    .bind(code)
    .fetch_optional(executor)
    .await?;
    Ok(invitation)
}
