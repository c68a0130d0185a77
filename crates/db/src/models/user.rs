use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("Username or email already taken")]
    AlreadyExists,
    #[error("Verification code is invalid or expired")]
    InvalidOtp,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub affiliation: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub affiliation: Option<String>,
}

/// One-time code emailed at registration; stored hashed.
#[derive(Debug, Clone, FromRow)]
pub struct EmailOtp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, UserError> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
        )
        .bind(&data.username)
        .bind(&data.email)
        .fetch_one(pool)
        .await?;
        if taken > 0 {
            return Err(UserError::AlreadyExists);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, affiliation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.full_name)
        .bind(&data.affiliation)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_email_verified(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET email_verified = 1, updated_at = datetime('now','subsec') WHERE id = ?1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn touch_last_login(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET last_login_at = datetime('now','subsec') WHERE id = ?1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

impl EmailOtp {
    /// Store a hashed verification code valid for ten minutes.
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        code_hash: &str,
    ) -> Result<Self, UserError> {
        let otp = sqlx::query_as::<_, EmailOtp>(
            r#"
            INSERT INTO email_otps (id, user_id, code_hash, expires_at)
            VALUES (?1, ?2, ?3, datetime('now', '+10 minutes'))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code_hash)
        .fetch_one(pool)
        .await?;
        Ok(otp)
    }

    /// Consume a matching, unexpired code. Fails if the code was already
    /// used, expired, or never issued.
    pub async fn consume(
        pool: &SqlitePool,
        user_id: Uuid,
        code_hash: &str,
    ) -> Result<(), UserError> {
        let result = sqlx::query(
            r#"
            UPDATE email_otps
            SET consumed = 1
            WHERE user_id = ?1
              AND code_hash = ?2
              AND consumed = 0
              AND expires_at > datetime('now')
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::InvalidOtp);
        }
        Ok(())
    }
}
