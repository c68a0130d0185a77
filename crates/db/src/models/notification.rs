use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Notification not found")]
    NotFound,
}

/// Fire-and-forget message row created as a side effect of state changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        subject: &str,
        body: &str,
    ) -> Result<Self, NotificationError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, subject, body)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(subject)
        .bind(body)
        .fetch_one(pool)
        .await?;
        Ok(notification)
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Mark read; scoped to the owner so one user cannot touch another's rows.
    pub async fn mark_read(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(), NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_user, setup_test_pool};

    #[tokio::test]
    async fn create_list_and_mark_read() {
        let pool = setup_test_pool().await;
        let user = create_test_user(&pool, "reader").await;
        let other = create_test_user(&pool, "other").await;

        let n = Notification::create(&pool, user.id, "Paper accepted", "Congratulations!")
            .await
            .unwrap();
        assert!(!n.is_read);

        let list = Notification::find_by_user(&pool, user.id).await.unwrap();
        assert_eq!(list.len(), 1);

        // Another user cannot mark it read.
        let denied = Notification::mark_read(&pool, n.id, other.id).await;
        assert!(matches!(denied, Err(NotificationError::NotFound)));

        Notification::mark_read(&pool, n.id, user.id).await.unwrap();
        let list = Notification::find_by_user(&pool, user.id).await.unwrap();
        assert!(list[0].is_read);
    }
}
