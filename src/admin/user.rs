//! User management for administrators.

use serde::Serialize;
use tracing::info;

use crate::db::{Database, Role, User, UserRepository};

use super::{require_admin, AdminError};

/// A row of the administrator's user list.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
            email: user.email.clone(),
            roles: user.roles().iter().collect(),
            created_at: user.created_at.clone(),
            last_login: user.last_login.clone(),
        }
    }
}

/// Account administration.
pub struct UserAdminService<'a> {
    db: &'a Database,
}

impl<'a> UserAdminService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(self.db.pool())
    }

    /// List every account, ordered by username.
    pub async fn list_users(&self, admin: &User) -> Result<Vec<UserSummary>, AdminError> {
        require_admin(admin)?;
        let users = self.repo().list_all().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Delete an account by username.
    ///
    /// Administrators cannot delete themselves. Posts keep their author name.
    pub async fn delete_user(&self, admin: &User, username: &str) -> Result<(), AdminError> {
        require_admin(admin)?;
        let username = username.trim();
        if username.eq_ignore_ascii_case(&admin.username) {
            return Err(AdminError::CannotModifySelf);
        }

        if !self.repo().delete_by_username(username).await? {
            return Err(AdminError::NotFound(format!("user {username}")));
        }

        info!(admin = %admin.username, username = %username, "User deleted");
        Ok(())
    }

    /// Grant or revoke a role.
    ///
    /// An administrator cannot revoke their own admin role, and every
    /// account keeps at least one role.
    pub async fn set_role(
        &self,
        admin: &User,
        username: &str,
        role: Role,
        enabled: bool,
    ) -> Result<UserSummary, AdminError> {
        require_admin(admin)?;
        let repo = self.repo();
        let target = repo
            .get_by_username(username.trim())
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("user {}", username.trim())))?;

        if target.id == admin.id && role == Role::Admin && !enabled {
            return Err(AdminError::CannotModifySelf);
        }

        let mut roles = target.roles();
        roles.set(role, enabled);
        if roles.is_empty() {
            return Err(AdminError::LastRole);
        }

        repo.set_role(&target.username, role, enabled).await?;
        let updated = repo
            .get_by_id(target.id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("user {}", target.username)))?;

        info!(
            admin = %admin.username,
            username = %updated.username,
            role = %role,
            enabled,
            "User role changed"
        );
        Ok(UserSummary::from(&updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;

    async fn setup() -> (Database, User, User) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        let admin = repo
            .create(&NewUser::new("admin1", "hash").with_role(Role::Admin))
            .await
            .unwrap();
        let student = repo
            .create(&NewUser::new("student1", "hash").with_role(Role::Student))
            .await
            .unwrap();
        (db, admin, student)
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let (db, admin, student) = setup().await;
        let service = UserAdminService::new(&db);

        let users = service.list_users(&admin).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(matches!(
            service.list_users(&student).await,
            Err(AdminError::NotAdmin)
        ));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (db, admin, _) = setup().await;
        let service = UserAdminService::new(&db);

        service.delete_user(&admin, "Student1").await.unwrap();
        assert!(matches!(
            service.delete_user(&admin, "student1").await,
            Err(AdminError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_user(&admin, "ADMIN1").await,
            Err(AdminError::CannotModifySelf)
        ));
    }

    #[tokio::test]
    async fn test_set_role() {
        let (db, admin, _) = setup().await;
        let service = UserAdminService::new(&db);

        let summary = service
            .set_role(&admin, "student1", Role::Reviewer, true)
            .await
            .unwrap();
        assert_eq!(summary.roles, vec![Role::Student, Role::Reviewer]);

        let summary = service
            .set_role(&admin, "student1", Role::Student, false)
            .await
            .unwrap();
        assert_eq!(summary.roles, vec![Role::Reviewer]);

        assert!(matches!(
            service.set_role(&admin, "student1", Role::Reviewer, false).await,
            Err(AdminError::LastRole)
        ));
        assert!(matches!(
            service.set_role(&admin, "admin1", Role::Admin, false).await,
            Err(AdminError::CannotModifySelf)
        ));
        assert!(matches!(
            service.set_role(&admin, "ghost", Role::Student, true).await,
            Err(AdminError::NotFound(_))
        ));
    }
}
