//! # User Repository
//!
//! Accounts that may act on the inventory. Only password *hashes* reach
//! this module; hashing and verification live at the API boundary.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::db_timestamp;
use stockroom_core::{Identity, UserRole, ValidationError};

/// A stored account, including its password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// PHC-format hash string.
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// The identity requests act as.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Returns
    /// * `Ok(UserRecord)` - The stored account
    /// * `Err(DbError::Core(Validation(Duplicate)))` - Username taken
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
    ) -> DbResult<UserRecord> {
        debug!(username = %username, role = ?role, "Creating user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(db_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(DbError::from)
        .map_err(|err| match err {
            DbError::UniqueViolation { .. } => ValidationError::Duplicate {
                field: "username".to_string(),
                value: username.to_string(),
            }
            .into(),
            other => other,
        })?;

        let user = self.get_by_id(result.last_insert_rowid()).await?;
        info!(id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Gets an account by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<UserRecord> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Finds an account by username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Replaces an account's password hash.
    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id, "Password changed");
        Ok(())
    }

    /// Every account's identity (no hashes), ordered by id.
    pub async fn list_identities(&self) -> DbResult<Vec<Identity>> {
        let users = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users.iter().map(UserRecord::identity).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stockroom_core::CoreError;

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.users().create("alice", "$argon2id$fake", UserRole::Admin).await.unwrap();

        let found = db.users().find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "$argon2id$fake");
        assert!(found.identity().is_admin());
        assert!(db.users().find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_validation_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create("alice", "h1", UserRole::Staff).await.unwrap();

        let err = db.users().create("alice", "h2", UserRole::Staff).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_password_hash() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create("alice", "old", UserRole::Staff).await.unwrap();

        db.users().update_password_hash(user.id, "new").await.unwrap();
        assert_eq!(db.users().get_by_id(user.id).await.unwrap().password_hash, "new");

        let err = db.users().update_password_hash(999, "x").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_identities_hides_hashes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create("alice", "h", UserRole::Admin).await.unwrap();
        db.users().create("bob", "h", UserRole::Staff).await.unwrap();

        let identities = db.users().list_identities().await.unwrap();
        let names: Vec<_> = identities.iter().map(|i| i.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob"]);
    }
}
