//! Authentication module for Foundation.
//!
//! Password hashing, input validation, account registration, login,
//! profile management and password recovery.

mod password;
mod profile;
mod recovery;
mod registration;
mod session;
pub mod validation;

pub use password::{hash_password, verify_password, HashError};
pub use profile::{
    change_password, get_profile, update_profile, ProfileError, ProfileUpdate, UserProfile,
    MAX_NAME_LENGTH,
};
pub use recovery::redeem_one_time_password;
pub use registration::{
    register_with_invitation, setup_first_admin, FirstAdminRequest,
    InvitationRegistrationRequest, RegistrationError,
};
pub use session::{authenticate, choose_role, AuthSession};
