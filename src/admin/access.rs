//! Invitation codes and one-time passwords issued by administrators.
//!
//! Codes are shown to the issuing administrator, who hands them on.

use serde::Serialize;
use tracing::info;

use crate::auth::validation::validate_email;
use crate::datetime::minutes_from_now;
use crate::db::{
    Database, InvitationRepository, OneTimePasswordRepository, Role, User, UserRepository,
};
use crate::FoundationError;

use super::{require_admin, AdminError};

/// An invitation that was just issued.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvitation {
    pub code: String,
    pub email: String,
    pub role: Role,
    pub deadline: String,
}

impl IssuedInvitation {
    /// Confirmation shown to the administrator.
    pub fn message(&self) -> String {
        format!(
            "Code: {} for role {} was sent to: {}",
            self.code,
            self.role.display_name(),
            self.email
        )
    }
}

/// A one-time password that was just issued.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedOneTimePassword {
    pub code: String,
    pub email: String,
    pub expires_at: String,
}

/// Issues invitation codes and one-time passwords.
pub struct AccessAdminService<'a> {
    db: &'a Database,
    invitation_validity_minutes: i64,
    one_time_password_validity_minutes: i64,
}

impl<'a> AccessAdminService<'a> {
    pub fn new(
        db: &'a Database,
        invitation_validity_minutes: i64,
        one_time_password_validity_minutes: i64,
    ) -> Self {
        Self {
            db,
            invitation_validity_minutes,
            one_time_password_validity_minutes,
        }
    }

    /// Invite `email` to create an account with `role`.
    ///
    /// Earlier invitations for the same address are replaced. An address
    /// that already belongs to an account cannot be invited.
    pub async fn issue_invitation(
        &self,
        admin: &User,
        email: &str,
        role: Role,
    ) -> Result<IssuedInvitation, AdminError> {
        require_admin(admin)?;
        let email = email.trim();
        validate_email(email)?;
        if email.eq_ignore_ascii_case(admin.email.trim()) {
            return Err(AdminError::CannotModifySelf);
        }

        if UserRepository::new(self.db.pool()).email_exists(email).await? {
            return Err(AdminError::Foundation(FoundationError::Conflict(
                "An account already uses this email address.".to_string(),
            )));
        }

        let invitations = InvitationRepository::new(self.db.pool());
        invitations.purge_expired().await?;
        let replaced = invitations.clear_for_email(email).await?;

        let deadline = minutes_from_now(self.invitation_validity_minutes);
        let invitation = invitations.create(email, role, &deadline).await?;

        info!(
            admin = %admin.username,
            email = %email,
            role = %role,
            replaced,
            "Invitation issued"
        );
        Ok(IssuedInvitation {
            code: invitation.code,
            email: invitation.email,
            role,
            deadline: invitation.deadline,
        })
    }

    /// Number of stored invitations.
    pub async fn invitation_count(&self, admin: &User) -> Result<i64, AdminError> {
        require_admin(admin)?;
        Ok(InvitationRepository::new(self.db.pool()).count().await?)
    }

    /// Issue a one-time password for the account registered with `email`.
    pub async fn issue_one_time_password(
        &self,
        admin: &User,
        email: &str,
    ) -> Result<IssuedOneTimePassword, AdminError> {
        require_admin(admin)?;
        let email = email.trim();
        validate_email(email)?;

        if !UserRepository::new(self.db.pool()).email_exists(email).await? {
            return Err(AdminError::NotFound(format!("account with email {email}")));
        }

        let otps = OneTimePasswordRepository::new(self.db.pool());
        otps.cleanup().await?;
        let expires_at = minutes_from_now(self.one_time_password_validity_minutes);
        let otp = otps.create(email, &expires_at).await?;

        info!(admin = %admin.username, email = %email, "One-time password issued");
        Ok(IssuedOneTimePassword {
            code: otp.code,
            email: otp.email,
            expires_at: otp.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, INVITATION_CODE_LENGTH};

    async fn setup() -> (Database, User) {
        let db = Database::open_in_memory().await.unwrap();
        let admin = UserRepository::new(db.pool())
            .create(
                &NewUser::new("admin1", "hash")
                    .with_email("admin@example.com")
                    .with_role(Role::Admin),
            )
            .await
            .unwrap();
        (db, admin)
    }

    #[tokio::test]
    async fn test_issue_invitation() {
        let (db, admin) = setup().await;
        let service = AccessAdminService::new(&db, 10, 60);

        let issued = service
            .issue_invitation(&admin, " new@example.com ", Role::Reviewer)
            .await
            .unwrap();
        assert_eq!(issued.code.len(), INVITATION_CODE_LENGTH);
        assert_eq!(issued.email, "new@example.com");
        assert_eq!(
            issued.message(),
            format!("Code: {} for role Reviewer was sent to: new@example.com", issued.code)
        );

        let invitations = InvitationRepository::new(db.pool());
        assert!(invitations.is_valid(&issued.code).await.unwrap());
        assert_eq!(
            invitations.role_for_code(&issued.code).await.unwrap(),
            Some(Role::Reviewer)
        );
    }

    #[tokio::test]
    async fn test_reissue_replaces_old_code() {
        let (db, admin) = setup().await;
        let service = AccessAdminService::new(&db, 10, 60);

        let first = service
            .issue_invitation(&admin, "new@example.com", Role::Student)
            .await
            .unwrap();
        let second = service
            .issue_invitation(&admin, "NEW@example.com", Role::Student)
            .await
            .unwrap();

        assert_eq!(service.invitation_count(&admin).await.unwrap(), 1);
        let invitations = InvitationRepository::new(db.pool());
        assert!(!invitations.is_valid(&first.code).await.unwrap());
        assert!(invitations.is_valid(&second.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_invitation_rejections() {
        let (db, admin) = setup().await;
        UserRepository::new(db.pool())
            .create(
                &NewUser::new("student1", "hash")
                    .with_email("student@example.com")
                    .with_role(Role::Student),
            )
            .await
            .unwrap();
        let service = AccessAdminService::new(&db, 10, 60);

        assert!(matches!(
            service.issue_invitation(&admin, "not an email", Role::Student).await,
            Err(AdminError::Email(_))
        ));
        assert!(matches!(
            service.issue_invitation(&admin, "Admin@example.com", Role::Student).await,
            Err(AdminError::CannotModifySelf)
        ));
        assert!(matches!(
            service.issue_invitation(&admin, "student@example.com", Role::Reviewer).await,
            Err(AdminError::Foundation(FoundationError::Conflict(_)))
        ));
        assert_eq!(service.invitation_count(&admin).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refused_invitation_keeps_outstanding_codes() {
        let (db, admin) = setup().await;
        let users = UserRepository::new(db.pool());
        let service = AccessAdminService::new(&db, 10, 60);

        let outstanding = service
            .issue_invitation(&admin, "late@example.com", Role::Student)
            .await
            .unwrap();
        // An account now owns the address, e.g. through a profile change.
        users
            .create(
                &NewUser::new("student1", "hash")
                    .with_email("late@example.com")
                    .with_role(Role::Student),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.issue_invitation(&admin, "late@example.com", Role::Reviewer).await,
            Err(AdminError::Foundation(FoundationError::Conflict(_)))
        ));
        assert!(InvitationRepository::new(db.pool())
            .is_valid(&outstanding.code)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_issue_one_time_password() {
        let (db, admin) = setup().await;
        let service = AccessAdminService::new(&db, 10, 60);

        let issued = service
            .issue_one_time_password(&admin, "admin@example.com")
            .await
            .unwrap();
        assert_eq!(issued.code.len(), crate::db::ONE_TIME_PASSWORD_LENGTH);

        assert!(matches!(
            service.issue_one_time_password(&admin, "ghost@example.com").await,
            Err(AdminError::NotFound(_))
        ));
    }
}
