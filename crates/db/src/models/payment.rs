use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Payment not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Completed,
}

/// One gateway checkout session for an accepted paper's registration fee.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub gateway_session_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub async fn create(
        pool: &SqlitePool,
        paper_id: Uuid,
        gateway_session_id: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<Self, PaymentError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, paper_id, gateway_session_id, amount_cents, currency)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(paper_id)
        .bind(gateway_session_id)
        .bind(amount_cents)
        .bind(currency)
        .fetch_one(pool)
        .await?;
        Ok(payment)
    }

    pub async fn find_by_gateway_session(
        pool: &SqlitePool,
        gateway_session_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE gateway_session_id = ?1",
        )
        .bind(gateway_session_id)
        .fetch_optional(pool)
        .await
    }

    /// Complete the payment. Returns false when the session was already
    /// completed, which lets the webhook acknowledge replays without
    /// re-running side effects.
    pub async fn complete(pool: &SqlitePool, id: Uuid) -> Result<bool, PaymentError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'completed', completed_at = datetime('now','subsec')
            WHERE id = ?1 AND status = 'created'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{
        create_test_conference, create_test_paper, create_test_user, setup_test_pool,
    };

    #[tokio::test]
    async fn completion_is_idempotent() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let payment = Payment::create(&pool, paper.id, "cs_test_123", 25_000, "usd")
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Created);

        assert!(Payment::complete(&pool, payment.id).await.unwrap());
        // Replay: acknowledged, but reports no transition.
        assert!(!Payment::complete(&pool, payment.id).await.unwrap());

        let stored = Payment::find_by_gateway_session(&pool, "cs_test_123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert!(stored.completed_at.is_some());
    }
}
