use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

use crate::services::AuthService;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Invite not found")]
    NotFound,
    #[error("Invite is no longer pending")]
    AlreadyResolved,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

/// Conference-wide invitation to join the program committee.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PcInvite {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub email: String,
    pub invited_by: Uuid,
    pub status: InviteStatus,
    pub token: String,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-paper invitation asking a reviewer to take an assignment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewInvite {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub email: String,
    pub invited_by: Uuid,
    pub status: InviteStatus,
    pub token: String,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Delegation from a PC member to an outside subreviewer whose verdict
/// lands as a recommendation rather than a decision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubreviewerInvite {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub pc_member_id: Uuid,
    pub email: String,
    pub status: InviteStatus,
    pub token: String,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Guarded transition out of `pending`. The WHERE clause is the idempotency
/// guard: zero affected rows means the invite was already resolved.
async fn transition(
    pool: &SqlitePool,
    table: &str,
    id: Uuid,
    next: InviteStatus,
    accepted_by: Option<Uuid>,
) -> Result<(), InviteError> {
    let sql = format!(
        r#"
        UPDATE {table}
        SET status = ?2, accepted_by = COALESCE(?3, accepted_by),
            updated_at = datetime('now','subsec')
        WHERE id = ?1 AND status = 'pending'
        "#
    );

    let result = sqlx::query(&sql)
        .bind(id)
        .bind(next)
        .bind(accepted_by)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        let exists: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"))
            .bind(id)
            .fetch_one(pool)
            .await?;
        return Err(if exists > 0 {
            InviteError::AlreadyResolved
        } else {
            InviteError::NotFound
        });
    }
    Ok(())
}

impl PcInvite {
    pub async fn create(
        pool: &SqlitePool,
        conference_id: Uuid,
        invited_by: Uuid,
        email: &str,
    ) -> Result<Self, InviteError> {
        let invite = sqlx::query_as::<_, PcInvite>(
            r#"
            INSERT INTO pc_invites (id, conference_id, email, invited_by, token)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conference_id)
        .bind(email)
        .bind(invited_by)
        .bind(AuthService::generate_invite_token())
        .fetch_one(pool)
        .await?;
        Ok(invite)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PcInvite>("SELECT * FROM pc_invites WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PcInvite>("SELECT * FROM pc_invites WHERE token = ?1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn accept(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<(), InviteError> {
        transition(pool, "pc_invites", id, InviteStatus::Accepted, Some(user_id)).await
    }

    pub async fn decline(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "pc_invites", id, InviteStatus::Declined, None).await
    }

    pub async fn cancel(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "pc_invites", id, InviteStatus::Cancelled, None).await
    }
}

impl ReviewInvite {
    pub async fn create(
        pool: &SqlitePool,
        paper_id: Uuid,
        invited_by: Uuid,
        email: &str,
    ) -> Result<Self, InviteError> {
        let invite = sqlx::query_as::<_, ReviewInvite>(
            r#"
            INSERT INTO review_invites (id, paper_id, email, invited_by, token)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(paper_id)
        .bind(email)
        .bind(invited_by)
        .bind(AuthService::generate_invite_token())
        .fetch_one(pool)
        .await?;
        Ok(invite)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReviewInvite>("SELECT * FROM review_invites WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReviewInvite>("SELECT * FROM review_invites WHERE token = ?1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Whether `user_id` holds an accepted review assignment for the paper.
    pub async fn has_accepted(
        pool: &SqlitePool,
        paper_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM review_invites
            WHERE paper_id = ?1 AND accepted_by = ?2 AND status = 'accepted'
            "#,
        )
        .bind(paper_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn accept(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<(), InviteError> {
        transition(pool, "review_invites", id, InviteStatus::Accepted, Some(user_id)).await
    }

    pub async fn decline(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "review_invites", id, InviteStatus::Declined, None).await
    }

    pub async fn cancel(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "review_invites", id, InviteStatus::Cancelled, None).await
    }
}

impl SubreviewerInvite {
    pub async fn create(
        pool: &SqlitePool,
        paper_id: Uuid,
        pc_member_id: Uuid,
        email: &str,
    ) -> Result<Self, InviteError> {
        let invite = sqlx::query_as::<_, SubreviewerInvite>(
            r#"
            INSERT INTO subreviewer_invites (id, paper_id, pc_member_id, email, token)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(paper_id)
        .bind(pc_member_id)
        .bind(email)
        .bind(AuthService::generate_invite_token())
        .fetch_one(pool)
        .await?;
        Ok(invite)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubreviewerInvite>("SELECT * FROM subreviewer_invites WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubreviewerInvite>(
            "SELECT * FROM subreviewer_invites WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Whether `user_id` is an accepted subreviewer for the paper.
    pub async fn has_accepted(
        pool: &SqlitePool,
        paper_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM subreviewer_invites
            WHERE paper_id = ?1 AND accepted_by = ?2 AND status = 'accepted'
            "#,
        )
        .bind(paper_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn accept(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<(), InviteError> {
        transition(pool, "subreviewer_invites", id, InviteStatus::Accepted, Some(user_id)).await
    }

    pub async fn decline(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "subreviewer_invites", id, InviteStatus::Declined, None).await
    }

    pub async fn cancel(pool: &SqlitePool, id: Uuid) -> Result<(), InviteError> {
        transition(pool, "subreviewer_invites", id, InviteStatus::Cancelled, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{
        create_test_conference, create_test_paper, create_test_user, setup_test_pool,
    };

    #[tokio::test]
    async fn pc_invite_accept_is_terminal() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let invitee = create_test_user(&pool, "invitee").await;
        let conference = create_test_conference(&pool, chair.id).await;

        let invite = PcInvite::create(&pool, conference.id, chair.id, "invitee@example.org")
            .await
            .unwrap();
        assert_eq!(invite.status, InviteStatus::Pending);

        PcInvite::accept(&pool, invite.id, invitee.id).await.unwrap();

        let resolved = PcInvite::find_by_id(&pool, invite.id).await.unwrap().unwrap();
        assert_eq!(resolved.status, InviteStatus::Accepted);
        assert_eq!(resolved.accepted_by, Some(invitee.id));

        // No way back out of a terminal state.
        let declined = PcInvite::decline(&pool, invite.id).await;
        assert!(matches!(declined, Err(InviteError::AlreadyResolved)));
        let cancelled = PcInvite::cancel(&pool, invite.id).await;
        assert!(matches!(cancelled, Err(InviteError::AlreadyResolved)));
    }

    #[tokio::test]
    async fn double_accept_is_rejected() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let invitee = create_test_user(&pool, "invitee").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let invite = ReviewInvite::create(&pool, paper.id, chair.id, "invitee@example.org")
            .await
            .unwrap();

        ReviewInvite::accept(&pool, invite.id, invitee.id).await.unwrap();
        let again = ReviewInvite::accept(&pool, invite.id, invitee.id).await;
        assert!(matches!(again, Err(InviteError::AlreadyResolved)));

        assert!(ReviewInvite::has_accepted(&pool, paper.id, invitee.id).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_invite_cannot_be_accepted() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let pc = create_test_user(&pool, "pc").await;
        let author = create_test_user(&pool, "author").await;
        let sub = create_test_user(&pool, "sub").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let invite = SubreviewerInvite::create(&pool, paper.id, pc.id, "sub@example.org")
            .await
            .unwrap();

        SubreviewerInvite::cancel(&pool, invite.id).await.unwrap();
        let accepted = SubreviewerInvite::accept(&pool, invite.id, sub.id).await;
        assert!(matches!(accepted, Err(InviteError::AlreadyResolved)));

        assert!(!SubreviewerInvite::has_accepted(&pool, paper.id, sub.id).await.unwrap());
    }

    #[tokio::test]
    async fn token_lookup_and_missing_invite() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let conference = create_test_conference(&pool, chair.id).await;

        let invite = PcInvite::create(&pool, conference.id, chair.id, "a@example.org")
            .await
            .unwrap();

        let found = PcInvite::find_by_token(&pool, &invite.token).await.unwrap();
        assert_eq!(found.unwrap().id, invite.id);

        let missing = PcInvite::accept(&pool, Uuid::new_v4(), chair.id).await;
        assert!(matches!(missing, Err(InviteError::NotFound)));
    }
}
