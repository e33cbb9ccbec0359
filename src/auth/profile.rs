//! User profile management.
//!
//! Viewing and editing one's own names and email address, and changing
//! one's password.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::auth::password::{hash_password, verify_password, HashError};
use crate::auth::validation::{validate_email, validate_password, EmailError, PasswordError};
use crate::db::{Database, Role, User, UserRepository, UserUpdate};
use crate::FoundationError;

/// Maximum length of a single name field.
pub const MAX_NAME_LENGTH: usize = 64;

/// Profile-related errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("user not found")]
    UserNotFound,

    #[error("{0}")]
    Email(#[from] EmailError),

    #[error("{0}")]
    Password(#[from] PasswordError),

    #[error("current password is incorrect")]
    WrongPassword,

    #[error("another account already uses this email address")]
    EmailInUse,

    #[error("{0} must be at most {MAX_NAME_LENGTH} characters")]
    NameTooLong(&'static str),

    #[error("password error: {0}")]
    Hash(#[from] HashError),

    #[error("{0}")]
    Foundation(#[from] FoundationError),
}

impl From<ProfileError> for FoundationError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::UserNotFound => FoundationError::NotFound("user".to_string()),
            ProfileError::WrongPassword => FoundationError::Auth(e.to_string()),
            ProfileError::EmailInUse => FoundationError::Conflict(e.to_string()),
            ProfileError::Hash(inner) => inner.into(),
            ProfileError::Foundation(inner) => inner,
            _ => FoundationError::Validation(e.to_string()),
        }
    }
}

/// A user's profile without the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub preferred_first_name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
            first_name: user.first_name.clone(),
            middle_name: user.middle_name.clone(),
            last_name: user.last_name.clone(),
            preferred_first_name: user.preferred_first_name.clone(),
            email: user.email.clone(),
            roles: user.roles().iter().collect(),
            created_at: user.created_at.clone(),
            last_login: user.last_login.clone(),
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Profile update request. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_first_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn preferred_first_name(mut self, value: impl Into<String>) -> Self {
        self.preferred_first_name = Some(value.into());
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    fn into_user_update(self) -> Result<UserUpdate, ProfileError> {
        let mut update = UserUpdate::new();

        if let Some(value) = clean_name("first name", self.first_name)? {
            update = update.first_name(value);
        }
        if let Some(value) = clean_name("middle name", self.middle_name)? {
            update = update.middle_name(value);
        }
        if let Some(value) = clean_name("last name", self.last_name)? {
            update = update.last_name(value);
        }
        if let Some(value) = clean_name("preferred first name", self.preferred_first_name)? {
            update = update.preferred_first_name(value);
        }

        if let Some(email) = self.email {
            let email = email.trim();
            validate_email(email)?;
            update = update.email(email);
        }

        Ok(update)
    }
}

fn clean_name(field: &'static str, value: Option<String>) -> Result<Option<String>, ProfileError> {
    let Some(value) = value else { return Ok(None) };
    let value = value.trim();
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ProfileError::NameTooLong(field));
    }
    Ok(Some(value.to_string()))
}

/// Get a user's profile by id.
pub async fn get_profile(db: &Database, user_id: i64) -> Result<UserProfile, ProfileError> {
    let user = UserRepository::new(db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or(ProfileError::UserNotFound)?;
    Ok(UserProfile::from(user))
}

/// Update names and email. Names are trimmed; the email must be valid and
/// not belong to another account.
pub async fn update_profile(
    db: &Database,
    user_id: i64,
    request: ProfileUpdate,
) -> Result<UserProfile, ProfileError> {
    let update = request.into_user_update()?;
    let users = UserRepository::new(db.pool());

    if let Some(email) = update.email.as_deref().filter(|e| !e.is_empty()) {
        if let Some(owner) = users.get_by_email(email).await? {
            if owner.id != user_id {
                return Err(ProfileError::EmailInUse);
            }
        }
    }

    let user = match users.update(user_id, &update).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ProfileError::UserNotFound),
        Err(FoundationError::Conflict(_)) => return Err(ProfileError::EmailInUse),
        Err(e) => return Err(e.into()),
    };

    info!(username = %user.username, user_id, "Profile updated");
    Ok(UserProfile::from(user))
}

/// Change a password after verifying the current one.
pub async fn change_password(
    db: &Database,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<(), ProfileError> {
    let users = UserRepository::new(db.pool());
    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or(ProfileError::UserNotFound)?;

    if verify_password(current_password, &user.password).is_err() {
        return Err(ProfileError::WrongPassword);
    }
    validate_password(new_password)?;

    let update = UserUpdate::new().password(hash_password(new_password)?);
    users.update(user_id, &update).await?;

    info!(username = %user.username, user_id, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;

    async fn seed(db: &Database) -> User {
        let new_user = NewUser::new("student1", hash_password("Aa!15678").unwrap())
            .with_email("student@example.com")
            .with_role(Role::Student);
        UserRepository::new(db.pool()).create(&new_user).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_profile() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;

        let profile = get_profile(&db, user.id).await.unwrap();
        assert_eq!(profile.username, "student1");
        assert_eq!(profile.display_name, "student1");
        assert_eq!(profile.roles, vec![Role::Student]);

        assert!(matches!(
            get_profile(&db, 999).await,
            Err(ProfileError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_trims_names() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;

        let request = ProfileUpdate::new()
            .first_name("  Philip ")
            .last_name("Fry  ")
            .preferred_first_name(" Phil");
        let profile = update_profile(&db, user.id, request).await.unwrap();

        assert_eq!(profile.first_name, "Philip");
        assert_eq!(profile.last_name, "Fry");
        assert_eq!(profile.preferred_first_name, "Phil");
        assert_eq!(profile.display_name, "Phil");
        assert_eq!(profile.email, "student@example.com");
    }

    #[tokio::test]
    async fn test_update_profile_validates_email() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;

        let result = update_profile(&db, user.id, ProfileUpdate::new().email("bad@")).await;
        assert!(matches!(result, Err(ProfileError::Email(_))));

        let profile = update_profile(&db, user.id, ProfileUpdate::new().email(" new@example.org "))
            .await
            .unwrap();
        assert_eq!(profile.email, "new@example.org");
    }

    #[tokio::test]
    async fn test_update_profile_rejects_email_of_another_account() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;
        let users = UserRepository::new(db.pool());
        let admin = users
            .create(
                &NewUser::new("admin1", hash_password("Aa!15678").unwrap())
                    .with_email("admin@example.com")
                    .with_role(Role::Admin),
            )
            .await
            .unwrap();

        let result = update_profile(&db, user.id, ProfileUpdate::new().email("ADMIN@example.com")).await;
        assert!(matches!(result, Err(ProfileError::EmailInUse)));
        let err: FoundationError = ProfileError::EmailInUse.into();
        assert!(matches!(err, FoundationError::Conflict(_)));

        // Re-saving your own address is fine.
        update_profile(&db, admin.id, ProfileUpdate::new().email("Admin@Example.com"))
            .await
            .unwrap();

        let stored = users.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "student@example.com");
    }

    #[tokio::test]
    async fn test_update_profile_name_too_long() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;

        let request = ProfileUpdate::new().last_name("x".repeat(MAX_NAME_LENGTH + 1));
        let result = update_profile(&db, user.id, request).await;
        assert!(matches!(result, Err(ProfileError::NameTooLong("last name"))));
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = Database::open_in_memory().await.unwrap();
        let user = seed(&db).await;

        let result = change_password(&db, user.id, "Wrong!123", "Bb@25678").await;
        assert!(matches!(result, Err(ProfileError::WrongPassword)));

        let result = change_password(&db, user.id, "Aa!15678", "weak").await;
        assert!(matches!(result, Err(ProfileError::Password(_))));

        change_password(&db, user.id, "Aa!15678", "Bb@25678").await.unwrap();
        let stored = UserRepository::new(db.pool())
            .get_by_id(user.id)
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("Bb@25678", &stored.password).is_ok());
    }
}
