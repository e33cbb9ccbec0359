//! User repository.
//!
//! CRUD operations on the `users` table.

use sqlx::{QueryBuilder, SqlitePool};

use super::user::{NewUser, Role, User, UserUpdate};
use crate::{FoundationError, Result};

const USER_COLUMNS: &str = "id, username, password, first_name, middle_name, last_name,
    preferred_first_name, email, admin_role, student_role, reviewer_role, created_at, last_login";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Fails with `Conflict` if the username or a non-empty email address is
    /// already taken (case-insensitively).
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = insert_user(self.pool, new_user).await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| FoundationError::NotFound("user".to_string()))
    }

    /// Create `new_user` only if the table has no accounts yet.
    ///
    /// The emptiness check and the insert are one statement, so two
    /// concurrent callers cannot both succeed. Returns None if an account
    /// already exists.
    pub async fn create_if_empty(&self, new_user: &NewUser) -> Result<Option<User>> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO users (username, password, first_name, middle_name, last_name,
                                preferred_first_name, email, admin_role, student_role, reviewer_role)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
             WHERE NOT EXISTS (SELECT 1 FROM users)
             RETURNING id",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.first_name)
        .bind(&new_user.middle_name)
        .bind(&new_user.last_name)
        .bind(&new_user.preferred_first_name)
        .bind(&new_user.email)
        .bind(new_user.roles.admin)
        .bind(new_user.roles.student)
        .bind(new_user.roles.reviewer)
        .fetch_optional(self.pool)
        .await
        .map_err(unique_violation)?;

        match id {
            Some(id) => self.get_by_id(id).await,
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FoundationError::Database(e.to_string()))?;
        Ok(user)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FoundationError::Database(e.to_string()))?;
        Ok(user)
    }

    /// Get the first account registered with an email address (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| FoundationError::Database(e.to_string()))?;
        Ok(user)
    }

    /// Update a user by ID.
    ///
    /// Only fields set in the update are modified. Returns the updated user,
    /// or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        let fields = [
            ("password", &update.password),
            ("first_name", &update.first_name),
            ("middle_name", &update.middle_name),
            ("last_name", &update.last_name),
            ("preferred_first_name", &update.preferred_first_name),
            ("email", &update.email),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                separated.push(format!("{column} = "));
                separated.push_bind_unseparated(value.clone());
            }
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(unique_violation)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Replace the password hash of the account registered with `email`.
    ///
    /// Exactly one account must match: none is `NotFound`, several is
    /// `Conflict` and nothing is changed.
    pub async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = ? COLLATE NOCASE AND email <> ''")
                .bind(email)
                .fetch_all(self.pool)
                .await?;

        let id = match ids.as_slice() {
            [id] => *id,
            [] => return Err(FoundationError::NotFound("account".to_string())),
            _ => {
                return Err(FoundationError::Conflict(
                    "several accounts share this email address".to_string(),
                ))
            }
        };

        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Grant or revoke one role. Returns false if the user does not exist.
    pub async fn set_role(&self, username: &str, role: Role, enabled: bool) -> Result<bool> {
        let sql = format!(
            "UPDATE users SET {} = ? WHERE username = ? COLLATE NOCASE",
            role.column()
        );
        let result = sqlx::query(&sql)
            .bind(enabled)
            .bind(username)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user by username. Returns true if a row was removed.
    pub async fn delete_by_username(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = ? COLLATE NOCASE")
            .bind(username)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All usernames, alphabetically.
    pub async fn list_usernames(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT username FROM users ORDER BY username COLLATE NOCASE")
            .fetch_all(self.pool)
            .await?;
        Ok(names)
    }

    /// All users, alphabetically by username.
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username COLLATE NOCASE"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Check whether a username is taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Check whether any account uses this email address.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}

/// Insert a user on any executor (pool or open transaction), returning its id.
pub(crate) async fn insert_user<'e, E>(executor: E, new_user: &NewUser) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query_scalar(
        "INSERT INTO users (username, password, first_name, middle_name, last_name,
                            preferred_first_name, email, admin_role, student_role, reviewer_role)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(&new_user.username)
    .bind(&new_user.password)
    .bind(&new_user.first_name)
    .bind(&new_user.middle_name)
    .bind(&new_user.last_name)
    .bind(&new_user.preferred_first_name)
    .bind(&new_user.email)
    .bind(new_user.roles.admin)
    .bind(new_user.roles.student)
    .bind(new_user.roles.reviewer)
    .fetch_one(executor)
    .await
    .map_err(unique_violation)
}

/// Map UNIQUE violations on `users` to `Conflict`, naming the column.
fn unique_violation(e: sqlx::Error) -> FoundationError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            if db_err.message().contains("users.email") {
                FoundationError::Conflict("email address already in use".to_string())
            } else {
                FoundationError::Conflict("username already exists".to_string())
            }
        }
        _ => FoundationError::Database(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, RoleSet};

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(
                &NewUser::new("Phil", "hash")
                    .with_email("phil@example.com")
                    .with_role(Role::Student),
            )
            .await
            .unwrap();

        assert_eq!(user.username, "Phil");
        assert_eq!(user.email, "phil@example.com");
        assert_eq!(user.roles(), RoleSet::only(Role::Student));
        assert!(user.last_login.is_none());

        let by_id = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "Phil");

        let by_name = repo.get_by_username("phil").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        let by_email = repo.get_by_email("PHIL@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("Phil", "hash")).await.unwrap();
        let result = repo.create(&NewUser::new("PHIL", "hash")).await;
        assert!(matches!(result, Err(FoundationError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_fields() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        let user = repo.create(&NewUser::new("Phil", "hash")).await.unwrap();

        let update = UserUpdate::new()
            .first_name("Philip")
            .middle_name("J")
            .last_name("Fry")
            .preferred_first_name("Phil")
            .email("fry@example.com");
        let updated = repo.update(user.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.first_name, "Philip");
        assert_eq!(updated.middle_name, "J");
        assert_eq!(updated.last_name, "Fry");
        assert_eq!(updated.preferred_first_name, "Phil");
        assert_eq!(updated.email, "fry@example.com");
        assert_eq!(updated.password, "hash");
    }

    #[tokio::test]
    async fn test_update_empty_and_missing() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        let user = repo.create(&NewUser::new("Phil", "hash")).await.unwrap();

        let same = repo.update(user.id, &UserUpdate::new()).await.unwrap().unwrap();
        assert_eq!(same.username, "Phil");

        let missing = repo
            .update(999, &UserUpdate::new().first_name("Nobody"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_password_by_email() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        let user = repo
            .create(&NewUser::new("Phil", "old").with_email("phil@example.com"))
            .await
            .unwrap();
        let other = repo
            .create(&NewUser::new("Leela", "leela").with_email("leela@example.com"))
            .await
            .unwrap();

        repo.update_password_by_email("PHIL@example.com", "new")
            .await
            .unwrap();
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.password, "new");
        let other = repo.get_by_id(other.id).await.unwrap().unwrap();
        assert_eq!(other.password, "leela");

        assert!(matches!(
            repo.update_password_by_email("nobody@example.com", "x").await,
            Err(FoundationError::NotFound(_))
        ));
        assert!(matches!(
            repo.update_password_by_email("", "x").await,
            Err(FoundationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_email_is_unique_per_account() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("Phil", "hash").with_email("phil@example.com"))
            .await
            .unwrap();

        let duplicate = repo
            .create(&NewUser::new("Mallory", "hash").with_email("Phil@Example.com"))
            .await;
        assert!(matches!(
            duplicate,
            Err(FoundationError::Conflict(msg)) if msg == "email address already in use"
        ));

        // Accounts without an address do not collide.
        repo.create(&NewUser::new("Amy", "hash")).await.unwrap();
        let kif = repo.create(&NewUser::new("Kif", "hash")).await.unwrap();

        let taken = repo
            .update(kif.id, &UserUpdate::new().email("phil@example.com"))
            .await;
        assert!(matches!(taken, Err(FoundationError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_if_empty() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());

        let first = repo
            .create_if_empty(&NewUser::new("first", "hash").with_role(Role::Admin))
            .await
            .unwrap();
        assert_eq!(first.map(|u| u.username).as_deref(), Some("first"));

        let second = repo
            .create_if_empty(&NewUser::new("second", "hash").with_role(Role::Admin))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_role() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("Phil", "hash").with_role(Role::Student))
            .await
            .unwrap();

        assert!(repo.set_role("Phil", Role::Reviewer, true).await.unwrap());
        let user = repo.get_by_username("Phil").await.unwrap().unwrap();
        assert_eq!(user.roles().count(), 2);

        assert!(repo.set_role("phil", Role::Student, false).await.unwrap());
        let user = repo.get_by_username("Phil").await.unwrap().unwrap();
        assert_eq!(user.roles(), RoleSet::only(Role::Reviewer));

        assert!(!repo.set_role("ghost", Role::Admin, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        let user = repo.create(&NewUser::new("Phil", "hash")).await.unwrap();

        repo.update_last_login(user.id).await.unwrap();
        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_delete_list_count() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("zeta", "hash")).await.unwrap();
        repo.create(&NewUser::new("Alpha", "hash")).await.unwrap();
        repo.create(&NewUser::new("mike", "hash")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(
            repo.list_usernames().await.unwrap(),
            vec!["Alpha", "mike", "zeta"]
        );
        assert_eq!(repo.list_all().await.unwrap().len(), 3);

        assert!(repo.delete_by_username("MIKE").await.unwrap());
        assert!(!repo.delete_by_username("mike").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(!repo.username_exists("mike").await.unwrap());
        assert!(repo.username_exists("ALPHA").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_exists() {
        let db = setup().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("Phil", "hash").with_email("phil@example.com"))
            .await
            .unwrap();

        assert!(repo.email_exists("Phil@Example.com").await.unwrap());
        assert!(!repo.email_exists("other@example.com").await.unwrap());
    }
}
