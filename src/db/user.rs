//! User model.
//!
//! Accounts carry three independent role flags; a user may hold any
//! combination of admin, student and reviewer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator: manages accounts and invitations.
    Admin,
    /// Student: takes part in the discussion board.
    Student,
    /// Reviewer: staff member who can see private posts.
    Reviewer,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Student, Role::Reviewer];

    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Reviewer => "reviewer",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Student => "Student",
            Role::Reviewer => "Reviewer",
        }
    }

    /// Whether acting in this role grants staff visibility on the board.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Reviewer)
    }

    /// Name of the boolean column holding this role.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Role::Admin => "admin_role",
            Role::Student => "student_role",
            Role::Reviewer => "reviewer_role",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "reviewer" => Ok(Role::Reviewer),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// The set of roles held by one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoleSet {
    pub admin: bool,
    pub student: bool,
    pub reviewer: bool,
}

impl RoleSet {
    /// A set holding exactly one role.
    pub fn only(role: Role) -> Self {
        let mut set = Self::default();
        set.set(role, true);
        set
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.admin,
            Role::Student => self.student,
            Role::Reviewer => self.reviewer,
        }
    }

    pub fn set(&mut self, role: Role, enabled: bool) {
        match role {
            Role::Admin => self.admin = enabled,
            Role::Student => self.student = enabled,
            Role::Reviewer => self.reviewer = enabled,
        }
    }

    /// Number of roles held.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Held roles in display order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }

    /// The only role held, if exactly one.
    pub fn single(&self) -> Option<Role> {
        let mut roles = self.iter();
        match (roles.next(), roles.next()) {
            (Some(role), None) => Some(role),
            _ => None,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC hash.
    pub password: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub preferred_first_name: String,
    pub email: String,
    pub admin_role: bool,
    pub student_role: bool,
    pub reviewer_role: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl User {
    /// Roles held by this account.
    pub fn roles(&self) -> RoleSet {
        RoleSet {
            admin: self.admin_role,
            student: self.student_role,
            reviewer: self.reviewer_role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles().contains(role)
    }

    /// The name to greet the user by: preferred first name, then first
    /// name, then username.
    pub fn display_name(&self) -> &str {
        [&self.preferred_first_name, &self.first_name]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Data for creating a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Argon2 PHC hash.
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub preferred_first_name: String,
    pub roles: RoleSet,
}

impl NewUser {
    /// Create a new account with no roles and empty profile fields.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password_hash.into(),
            email: String::new(),
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            preferred_first_name: String::new(),
            roles: RoleSet::default(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Add a role to the new account.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.set(role, true);
        self
    }

    pub fn with_names(
        mut self,
        first: impl Into<String>,
        middle: impl Into<String>,
        last: impl Into<String>,
    ) -> Self {
        self.first_name = first.into();
        self.middle_name = middle.into();
        self.last_name = last.into();
        self
    }
}

/// Partial update of an account. Unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub preferred_first_name: Option<String>,
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password hash.
    pub fn password(mut self, password_hash: impl Into<String>) -> Self {
        self.password = Some(password_hash.into());
        self
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn middle_name(mut self, value: impl Into<String>) -> Self {
        self.middle_name = Some(value.into());
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

    pub fn is_empty(&self) -> bool {
        self.password.is_none()
            && self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.preferred_first_name.is_none()
            && self.email.is_none()
    }
}
