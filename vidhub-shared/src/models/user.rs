/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(64) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     full_name VARCHAR(255) NOT NULL,
///     avatar VARCHAR(1024) NOT NULL,
///     cover_image VARCHAR(1024),
///     watch_history UUID[] NOT NULL DEFAULT '{}',
///     password_hash VARCHAR(255) NOT NULL,
///     refresh_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `User` carries the password hash and the current refresh token and is
/// therefore never serialized. Everything that leaves the API goes through
/// [`PublicUser`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{self, PasswordError};

const USER_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, watch_history, \
                            password_hash, refresh_token, created_at, updated_at";

/// Stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Unique handle, stored trimmed and lowercase
    pub username: String,

    /// Unique email address, stored trimmed and lowercase
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Avatar URL on the media host
    pub avatar: String,

    /// Optional cover image URL on the media host
    pub cover_image: Option<String>,

    /// Watched video IDs, oldest first
    pub watch_history: Vec<Uuid>,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Most recently issued refresh token, cleared on logout
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as exposed over the API (no password hash, no refresh token)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            watch_history: user.watch_history.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

/// Registration data with the plaintext password
///
/// Converted into [`CreateUser`] by [`NewUser::into_create`], which is the
/// only place a password is hashed before an insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Input for inserting a user (password already hashed)
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

impl NewUser {
    /// Normalizes identifiers and hashes the password
    pub fn into_create(self) -> Result<CreateUser, PasswordError> {
        let password_hash = password::hash_password(&self.password)?;

        Ok(CreateUser {
            username: normalize_identifier(&self.username),
            email: normalize_identifier(&self.email),
            full_name: self.full_name.trim().to_string(),
            password_hash,
            avatar: self.avatar,
            cover_image: self.cover_image,
        })
    }
}

/// Trims and lowercases a username or email
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

impl User {
    /// Checks a plaintext password against the stored hash
    pub fn is_password_correct(&self, candidate: &str) -> Result<bool, PasswordError> {
        password::verify_password(candidate, &self.password_hash)
    }

    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on a duplicate username or email (unique
    /// constraints `users_username_key` / `users_email_key`).
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, full_name, password_hash, avatar, cover_image) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.full_name)
            .bind(data.password_hash)
            .bind(data.avatar)
            .bind(data.cover_image)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the first user matching either identifier
    ///
    /// A `None` identifier never matches. Callers pass normalized values.
    pub async fn find_by_username_or_email(
        pool: &PgPool,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE username = $1 OR email = $2 \
             ORDER BY created_at \
             LIMIT 1"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Stores the most recently issued refresh token
    ///
    /// Single-row update; it does not touch `updated_at` since no profile
    /// field changes.
    pub async fn set_refresh_token(
        pool: &PgPool,
        id: Uuid,
        refresh_token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id)
            .bind(refresh_token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the stored refresh token (logout)
    pub async fn clear_refresh_token(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces full name and email
    pub async fn update_account(
        pool: &PgPool,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET full_name = $2, email = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(full_name)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the avatar URL
    pub async fn update_avatar(
        pool: &PgPool,
        id: Uuid,
        avatar: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET avatar = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(avatar)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the cover image URL
    pub async fn update_cover_image(
        pool: &PgPool,
        id: Uuid,
        cover_image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET cover_image = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(cover_image)
            .fetch_optional(pool)
            .await
    }
}
