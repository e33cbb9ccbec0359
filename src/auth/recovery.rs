//! Password recovery with one-time passwords.

use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::auth::validation::{validate_email, validate_password};
use crate::db::{Database, OneTimePasswordRepository, UserRepository};
use crate::{FoundationError, Result};

/// Replace the password of the account registered with `email`.
///
/// The new password is checked before the code is consumed, so a rejected
/// password does not burn the code.
pub async fn redeem_one_time_password(
    db: &Database,
    email: &str,
    code: &str,
    new_password: &str,
) -> Result<()> {
    let email = email.trim();
    let code = code.trim();
    validate_email(email)?;
    validate_password(new_password)?;
    let password_hash = hash_password(new_password)?;

    let otps = OneTimePasswordRepository::new(db.pool());
    if otps.consume(email, code).await?.is_none() {
        warn!(email = %email, "Rejected one-time password");
        return Err(FoundationError::Auth(
            "one-time password is invalid, used, or expired".to_string(),
        ));
    }

    UserRepository::new(db.pool())
        .update_password_by_email(email, &password_hash)
        .await?;

    info!(email = %email, "Password reset with one-time password");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::datetime::minutes_from_now;
    use crate::db::{NewUser, Role};

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(db.pool())
            .create(
                &NewUser::new("student1", hash_password("Aa!15678").unwrap())
                    .with_email("student@example.com")
                    .with_role(Role::Student),
            )
            .await
            .unwrap();
        let otp = OneTimePasswordRepository::new(db.pool())
            .create("student@example.com", &minutes_from_now(60))
            .await
            .unwrap();
        (db, otp.code)
    }

    async fn stored_hash(db: &Database) -> String {
        UserRepository::new(db.pool())
            .get_by_username("student1")
            .await
            .unwrap()
            .unwrap()
            .password
    }

    #[tokio::test]
    async fn test_redeem_replaces_password() {
        let (db, code) = setup().await;

        redeem_one_time_password(&db, "student@example.com", &code, "Bb@25678")
            .await
            .unwrap();
        assert!(verify_password("Bb@25678", &stored_hash(&db).await).is_ok());

        let again = redeem_one_time_password(&db, "student@example.com", &code, "Cc#35678").await;
        assert!(matches!(again, Err(FoundationError::Auth(_))));
    }

    #[tokio::test]
    async fn test_weak_password_keeps_code() {
        let (db, code) = setup().await;

        let result = redeem_one_time_password(&db, "student@example.com", &code, "weak").await;
        assert!(matches!(result, Err(FoundationError::Validation(_))));

        redeem_one_time_password(&db, "student@example.com", &code, "Bb@25678")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_email_is_rejected() {
        let (db, code) = setup().await;

        let result = redeem_one_time_password(&db, "other@example.com", &code, "Bb@25678").await;
        assert!(matches!(result, Err(FoundationError::Auth(_))));
        assert!(verify_password("Aa!15678", &stored_hash(&db).await).is_ok());
    }
}
