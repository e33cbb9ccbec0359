//! Administration module for Foundation.
//!
//! - User management (list, delete, grant and revoke roles)
//! - Access management (invitation codes and one-time passwords)
//!
//! Every operation requires an acting user that holds the admin role.

mod access;
mod user;

pub use access::{AccessAdminService, IssuedInvitation, IssuedOneTimePassword};
pub use user::{UserAdminService, UserSummary};

use thiserror::Error;

use crate::auth::validation::EmailError;
use crate::db::{Role, User};
use crate::FoundationError;

/// Admin-related errors.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("administrator role required")]
    NotAdmin,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Please choose another user that isn't you.")]
    CannotModifySelf,

    #[error("a user must keep at least one role")]
    LastRole,

    #[error("{0}")]
    Email(#[from] EmailError),

    #[error("{0}")]
    Foundation(#[from] FoundationError),
}

impl From<AdminError> for FoundationError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::NotAdmin | AdminError::CannotModifySelf => {
                FoundationError::Permission(e.to_string())
            }
            AdminError::NotFound(what) => FoundationError::NotFound(what),
            AdminError::Foundation(inner) => inner,
            AdminError::LastRole | AdminError::Email(_) => {
                FoundationError::Validation(e.to_string())
            }
        }
    }
}

/// Require that `user` holds the admin role.
pub fn require_admin(user: &User) -> Result<(), AdminError> {
    if user.has_role(Role::Admin) {
        Ok(())
    } else {
        Err(AdminError::NotAdmin)
    }
}
