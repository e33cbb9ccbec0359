//! Login.
//!
//! Verifies credentials and settles which role the user acts in for the
//! rest of the session.

use tracing::{info, warn};

use crate::auth::password::verify_password;
use crate::db::{Database, Role, User, UserRepository};
use crate::{FoundationError, Result};

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// An authenticated user together with the role chosen at login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub role: Role,
}

/// Pick the acting role for `user`.
///
/// A requested role must be held. Without a request, a user holding exactly
/// one role acts in it; a user holding several must choose.
pub fn choose_role(user: &User, requested: Option<Role>) -> Result<Role> {
    let roles = user.roles();
    match requested {
        Some(role) if roles.contains(role) => Ok(role),
        Some(role) => Err(FoundationError::Permission(format!(
            "{} does not have the {} role",
            user.username,
            role.display_name()
        ))),
        None => roles.single().ok_or_else(|| {
            let held: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
            if held.is_empty() {
                FoundationError::Permission(format!("{} has no role assigned", user.username))
            } else {
                FoundationError::Validation(format!(
                    "choose a role to sign in with: {}",
                    held.join(", ")
                ))
            }
        }),
    }
}

/// Authenticate with username and password.
///
/// Unknown usernames and wrong passwords produce the same error.
pub async fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
    requested_role: Option<Role>,
) -> Result<AuthSession> {
    let users = UserRepository::new(db.pool());
    let user = match users.get_by_username(username.trim()).await? {
        Some(user) => user,
        None => {
            warn!(username = %username, "Login attempt for unknown user");
            return Err(FoundationError::Auth(INVALID_CREDENTIALS.to_string()));
        }
    };

    if verify_password(password, &user.password).is_err() {
        warn!(username = %user.username, "Login failed: wrong password");
        return Err(FoundationError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    let role = choose_role(&user, requested_role)?;
    users.update_last_login(user.id).await?;
    info!(username = %user.username, user_id = user.id, role = %role, "User logged in");

    Ok(AuthSession { user, role })
}
