use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// User fields needed for per-request auth, joined through a live session.
#[derive(Debug, Clone, FromRow)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub is_superuser: bool,
    pub is_active: bool,
    pub email_verified: bool,
}

impl Session {
    /// Thirty-day session keyed by the SHA256 of the opaque token.
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES (?1, ?2, ?3, datetime('now', '+30 days'))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_user_by_token_hash(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<SessionUser>, sqlx::Error> {
        sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT u.id AS user_id, u.is_superuser, u.is_active, u.email_verified
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.token_hash = ?1 AND s.expires_at > datetime('now')
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_by_token_hash(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_user, setup_test_pool};
    use crate::services::AuthService;

    #[tokio::test]
    async fn session_lookup_and_logout() {
        let pool = setup_test_pool().await;
        let user = create_test_user(&pool, "linus").await;

        let token = AuthService::generate_session_token();
        let token_hash = AuthService::hash_session_token(&token);
        Session::create(&pool, user.id, &token_hash).await.unwrap();

        let found = Session::find_user_by_token_hash(&pool, &token_hash)
            .await
            .unwrap()
            .expect("session should resolve");
        assert_eq!(found.user_id, user.id);

        Session::delete_by_token_hash(&pool, &token_hash).await.unwrap();
        assert!(
            Session::find_user_by_token_hash(&pool, &token_hash)
                .await
                .unwrap()
                .is_none()
        );
    }
}
