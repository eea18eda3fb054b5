/// User model and database operations
///
/// Users are the staff members and volunteers imported from the Views
/// directory. Staff become `Admin`, volunteers become `Mentor`. A user is only
/// ever created by the directory sync; the core never deletes one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id VARCHAR(64),
///     first_name VARCHAR(255) NOT NULL DEFAULT '',
///     last_name VARCHAR(255) NOT NULL DEFAULT '',
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(16) NOT NULL CHECK (role IN ('Admin', 'Mentor')),
///     activity_status VARCHAR(64) NOT NULL DEFAULT 'Active',
///     reset_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX users_external_id_key ON users (external_id)
///     WHERE external_id IS NOT NULL;
/// ```
///
/// # Example
///
/// ```no_run
/// use baytree_shared::models::user::{CreateUser, User, UserRole};
/// use baytree_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     external_id: Some("1042".to_string()),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.org".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Mentor,
///     activity_status: "Active".to_string(),
/// }).await?;
///
/// let found = User::find_by_external_id(&pool, "1042").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Email stored for directory contacts without one
///
/// Shared by every such user, so it never identifies anyone.
pub const NO_EMAIL: &str = "NO EMAIL ASSOCIATED";

/// Columns selected for every `User` query
const USER_COLUMNS: &str = "id, external_id, first_name, last_name, email, password_hash, \
     role, activity_status, reset_token, created_at, updated_at";

/// Local role of a user
///
/// Stored as its display name (`Admin` / `Mentor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Staff member with administrative access
    Admin,

    /// Volunteer who mentors one or more mentees
    Mentor,
}

impl UserRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Mentor => "Mentor",
        }
    }

    /// Maps the directory's `TypeName` taxonomy onto a local role
    ///
    /// Only the exact value `volunteer` yields `Mentor`; everything else,
    /// including a missing type, is `Admin`.
    pub fn from_directory_type(type_name: Option<&str>) -> Self {
        match type_name {
            Some("volunteer") => UserRole::Mentor,
            _ => UserRole::Admin,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role string is not recognised
#[derive(Debug, thiserror::Error)]
#[error("Unknown user role: {0}")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for UserRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Admin" => Ok(UserRole::Admin),
            "Mentor" => Ok(UserRole::Mentor),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// User model representing a staff or volunteer account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique local user ID (UUID v4)
    pub id: Uuid,

    /// Views `PersonID`; unique across users when present
    pub external_id: Option<String>,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address (a placeholder when the directory has none)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Local role
    #[sqlx(try_from = "String")]
    pub role: UserRole,

    /// Directory activity status (e.g. "Active")
    pub activity_status: String,

    /// Outstanding password-reset token, if one has been issued
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Views `PersonID`
    pub external_id: Option<String>,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Local role
    pub role: UserRole,

    /// Directory activity status
    pub activity_status: String,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The external ID already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (external_id, first_name, last_name, email, password_hash, role, activity_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.external_id)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.role.as_str())
            .bind(data.activity_status)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by local ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by Views `PersonID`
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    ///
    /// Emails are not unique (several imported users may share the
    /// placeholder), so the oldest match wins.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY created_at ASC LIMIT 1"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user holding an outstanding reset token
    pub async fn find_by_reset_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Stores (or clears) the reset token for a user
    ///
    /// # Returns
    ///
    /// The updated user, None if the user doesn't exist
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET reset_token = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the password hash and clears the reset token in one write
    ///
    /// Only applies while the user still holds `expected_token`; returns
    /// `None` once the token has been redeemed or replaced.
    pub async fn replace_credentials(
        pool: &PgPool,
        id: Uuid,
        expected_token: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET password_hash = $2, reset_token = NULL, updated_at = NOW()
             WHERE id = $1 AND reset_token = $3
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(password_hash)
            .bind(expected_token)
            .fetch_optional(pool)
            .await
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
