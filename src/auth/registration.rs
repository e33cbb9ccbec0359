//! Account creation.
//!
//! Two ways in: the very first account becomes the administrator, and every
//! later account is created from an invitation code that fixes its role and
//! email address.

use thiserror::Error;
use tracing::info;

use crate::auth::password::{hash_password, HashError};
use crate::auth::validation::{
    validate_email, validate_password, validate_username, EmailError, PasswordError,
    UsernameError,
};
use crate::db::{claim_invitation, insert_user, Database, NewUser, Role, User, UserRepository};
use crate::FoundationError;

/// Registration errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    Username(#[from] UsernameError),

    #[error("{0}")]
    Password(#[from] PasswordError),

    #[error("{0}")]
    Email(#[from] EmailError),

    #[error("the two passwords do not match")]
    PasswordMismatch,

    #[error("username already exists")]
    UsernameExists,

    #[error("an account already uses this email address")]
    EmailInUse,

    #[error("invitation code is invalid or has expired")]
    InvalidInvitation,

    #[error("an account already exists; first-time setup is closed")]
    SetupClosed,

    #[error("password error: {0}")]
    Hash(#[from] HashError),

    #[error("{0}")]
    Foundation(#[from] FoundationError),
}

impl From<RegistrationError> for FoundationError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::UsernameExists | RegistrationError::EmailInUse => {
                FoundationError::Conflict(e.to_string())
            }
            RegistrationError::SetupClosed => FoundationError::Permission(e.to_string()),
            RegistrationError::Hash(inner) => inner.into(),
            RegistrationError::Foundation(inner) => inner,
            _ => FoundationError::Validation(e.to_string()),
        }
    }
}

/// Data for the first administrator account.
#[derive(Debug, Clone)]
pub struct FirstAdminRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub email: Option<String>,
}

/// Data for an account created from an invitation.
#[derive(Debug, Clone)]
pub struct InvitationRegistrationRequest {
    pub invitation_code: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

fn require(field: &'static str, value: &str) -> Result<(), RegistrationError> {
    if value.trim().is_empty() {
        return Err(RegistrationError::MissingField(field));
    }
    Ok(())
}

fn check_credentials(
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<(), RegistrationError> {
    require("username", username)?;
    require("password", password)?;
    validate_username(username)?;
    validate_password(password)?;
    if password != password_confirm {
        return Err(RegistrationError::PasswordMismatch);
    }
    Ok(())
}

/// Create the first administrator.
///
/// Only allowed while the database has no accounts. The emptiness check is
/// repeated inside the insert, so concurrent requests create one admin.
pub async fn setup_first_admin(
    db: &Database,
    request: FirstAdminRequest,
) -> Result<User, RegistrationError> {
    if !db.is_empty().await {
        return Err(RegistrationError::SetupClosed);
    }

    check_credentials(&request.username, &request.password, &request.password_confirm)?;
    let email = match request.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            validate_email(email)?;
            email.to_string()
        }
        _ => String::new(),
    };

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser::new(&request.username, password_hash)
        .with_email(email)
        .with_role(Role::Admin);

    let user = UserRepository::new(db.pool())
        .create_if_empty(&new_user)
        .await?
        .ok_or(RegistrationError::SetupClosed)?;
    info!(username = %user.username, user_id = user.id, "First administrator created");
    Ok(user)
}

/// Create an account from an invitation code.
///
/// The account receives the invitation's role and email address. The code
/// is claimed and the account inserted in one transaction: a code creates
/// at most one account, and a failed registration leaves the code usable.
pub async fn register_with_invitation(
    db: &Database,
    request: InvitationRegistrationRequest,
) -> Result<User, RegistrationError> {
    require("invitation code", &request.invitation_code)?;
    check_credentials(&request.username, &request.password, &request.password_confirm)?;
    let code = request.invitation_code.trim();
    let password_hash = hash_password(&request.password)?;

    let mut tx = db.pool().begin().await.map_err(FoundationError::from)?;

    let invitation = claim_invitation(&mut *tx, code)
        .await?
        .ok_or(RegistrationError::InvalidInvitation)?;
    let role = invitation.role()?;

    let email_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)",
    )
    .bind(&invitation.email)
    .fetch_one(&mut *tx)
    .await
    .map_err(FoundationError::from)?;
    if email_taken {
        return Err(RegistrationError::EmailInUse);
    }

    let new_user = NewUser::new(&request.username, password_hash)
        .with_email(&invitation.email)
        .with_role(role);
    let user_id = match insert_user(&mut *tx, &new_user).await {
        Ok(id) => id,
        Err(FoundationError::Conflict(_)) => return Err(RegistrationError::UsernameExists),
        Err(e) => return Err(e.into()),
    };

    tx.commit().await.map_err(FoundationError::from)?;

    let user = UserRepository::new(db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| FoundationError::NotFound("user".to_string()))?;

    info!(
        username = %user.username,
        user_id = user.id,
        role = %role,
        "New user registered from invitation"
    );
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::datetime::minutes_from_now;
    use crate::db::InvitationRepository;

    fn first_admin() -> FirstAdminRequest {
        FirstAdminRequest {
            username: "Admin1".to_string(),
            password: "Aa!15678".to_string(),
            password_confirm: "Aa!15678".to_string(),
            email: Some("admin@example.com".to_string()),
        }
    }

    fn invited(code: &str, username: &str) -> InvitationRegistrationRequest {
        InvitationRegistrationRequest {
            invitation_code: code.to_string(),
            username: username.to_string(),
            password: "valid_P@ssw0rd".to_string(),
            password_confirm: "valid_P@ssw0rd".to_string(),
        }
    }

    #[tokio::test]
    async fn test_setup_first_admin() {
        let db = Database::open_in_memory().await.unwrap();

        let admin = setup_first_admin(&db, first_admin()).await.unwrap();
        assert_eq!(admin.username, "Admin1");
        assert!(admin.has_role(Role::Admin));
        assert_eq!(admin.roles().count(), 1);
        assert_eq!(admin.email, "admin@example.com");
        assert!(verify_password("Aa!15678", &admin.password).is_ok());
    }

    #[tokio::test]
    async fn test_setup_first_admin_only_once() {
        let db = Database::open_in_memory().await.unwrap();
        setup_first_admin(&db, first_admin()).await.unwrap();

        let mut second = first_admin();
        second.username = "Admin2".to_string();
        let result = setup_first_admin(&db, second).await;
        assert!(matches!(result, Err(RegistrationError::SetupClosed)));
    }

    #[tokio::test]
    async fn test_setup_first_admin_validation() {
        let db = Database::open_in_memory().await.unwrap();

        let mut request = first_admin();
        request.username = "1Flask".to_string();
        assert!(matches!(
            setup_first_admin(&db, request).await,
            Err(RegistrationError::Username(UsernameError::StartsWithDigit))
        ));

        let mut request = first_admin();
        request.password_confirm = "Aa!15679".to_string();
        assert!(matches!(
            setup_first_admin(&db, request).await,
            Err(RegistrationError::PasswordMismatch)
        ));

        let mut request = first_admin();
        request.password = "short7!".to_string();
        request.password_confirm = "short7!".to_string();
        assert!(matches!(
            setup_first_admin(&db, request).await,
            Err(RegistrationError::Password(_))
        ));

        let mut request = first_admin();
        request.email = Some("not-an-email".to_string());
        assert!(matches!(
            setup_first_admin(&db, request).await,
            Err(RegistrationError::Email(_))
        ));

        assert!(db.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_with_invitation() {
        let db = Database::open_in_memory().await.unwrap();
        let invitations = InvitationRepository::new(db.pool());
        let invitation = invitations
            .create("student@example.com", Role::Student, &minutes_from_now(10))
            .await
            .unwrap();

        let user = register_with_invitation(&db, invited(&invitation.code, "pilot.Jimmy"))
            .await
            .unwrap();

        assert_eq!(user.username, "pilot.Jimmy");
        assert_eq!(user.email, "student@example.com");
        assert!(user.has_role(Role::Student));
        assert!(!user.has_role(Role::Admin));
        assert!(invitations.get_by_code(&invitation.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invitation_is_single_use() {
        let db = Database::open_in_memory().await.unwrap();
        let invitation = InvitationRepository::new(db.pool())
            .create("student@example.com", Role::Student, &minutes_from_now(10))
            .await
            .unwrap();

        register_with_invitation(&db, invited(&invitation.code, "first"))
            .await
            .unwrap();
        let result = register_with_invitation(&db, invited(&invitation.code, "second")).await;
        assert!(matches!(result, Err(RegistrationError::InvalidInvitation)));
    }

    #[tokio::test]
    async fn test_register_with_expired_or_unknown_invitation() {
        let db = Database::open_in_memory().await.unwrap();
        let expired = InvitationRepository::new(db.pool())
            .create("late@example.com", Role::Reviewer, &minutes_from_now(-1))
            .await
            .unwrap();

        assert!(matches!(
            register_with_invitation(&db, invited(&expired.code, "lateuser")).await,
            Err(RegistrationError::InvalidInvitation)
        ));
        assert!(matches!(
            register_with_invitation(&db, invited("zzzzzz", "ghostuser")).await,
            Err(RegistrationError::InvalidInvitation)
        ));
        assert!(matches!(
            register_with_invitation(&db, invited("  ", "ghostuser")).await,
            Err(RegistrationError::MissingField("invitation code"))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_keeps_invitation() {
        let db = Database::open_in_memory().await.unwrap();
        setup_first_admin(&db, first_admin()).await.unwrap();

        let invitations = InvitationRepository::new(db.pool());
        let invitation = invitations
            .create("student@example.com", Role::Student, &minutes_from_now(10))
            .await
            .unwrap();

        let result = register_with_invitation(&db, invited(&invitation.code, "admin1")).await;
        assert!(matches!(result, Err(RegistrationError::UsernameExists)));
        assert!(invitations.is_valid(&invitation.code).await.unwrap());
    }

    #[test]
    fn test_error_mapping() {
        let err: FoundationError = RegistrationError::UsernameExists.into();
        assert!(matches!(err, FoundationError::Conflict(_)));
        let err: FoundationError = RegistrationError::SetupClosed.into();
        assert!(matches!(err, FoundationError::Permission(_)));
        let err: FoundationError = RegistrationError::PasswordMismatch.into();
        assert!(matches!(err, FoundationError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invited_email_already_in_use_keeps_invitation() {
        let db = Database::open_in_memory().await.unwrap();
        setup_first_admin(&db, first_admin()).await.unwrap();

        let invitations = InvitationRepository::new(db.pool());
        let invitation = invitations
            .create("Admin@Example.com", Role::Student, &minutes_from_now(10))
            .await
            .unwrap();

        let result = register_with_invitation(&db, invited(&invitation.code, "second")).await;
        assert!(matches!(result, Err(RegistrationError::EmailInUse)));
        assert!(invitations.is_valid(&invitation.code).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_share_one_code() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("board.db")).await.unwrap();
        let invitation = InvitationRepository::new(db.pool())
            .create("student@example.com", Role::Student, &minutes_from_now(10))
            .await
            .unwrap();

        let (alice, bobby) = tokio::join!(
            register_with_invitation(&db, invited(&invitation.code, "alice1")),
            register_with_invitation(&db, invited(&invitation.code, "bobby1")),
        );

        assert_eq!(alice.is_ok() as u8 + bobby.is_ok() as u8, 1);
        let loser = if alice.is_ok() { bobby } else { alice };
        assert!(matches!(loser, Err(RegistrationError::InvalidInvitation)));
        assert_eq!(UserRepository::new(db.pool()).count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_admin_setup() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("board.db")).await.unwrap();

        let mut other = first_admin();
        other.username = "Admin2".to_string();
        other.email = None;
        let (first, second) = tokio::join!(
            setup_first_admin(&db, first_admin()),
            setup_first_admin(&db, other),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(RegistrationError::SetupClosed)));
        assert_eq!(UserRepository::new(db.pool()).count().await.unwrap(), 1);
    }
}
