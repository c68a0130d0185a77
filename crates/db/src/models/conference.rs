use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConferenceError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conference not found")]
    NotFound,
    #[error("Track already exists for this conference")]
    DuplicateTrack,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conference {
    pub id: Uuid,
    pub chair_id: Uuid,
    pub name: String,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub is_approved: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub submission_deadline: Option<DateTime<Utc>>,
    pub review_deadline: Option<DateTime<Utc>>,
    pub rebuttal_deadline: Option<DateTime<Utc>>,
    pub decision_deadline: Option<DateTime<Utc>>,
    pub reviewers_per_paper: i64,
    pub registration_fee_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConference {
    pub name: String,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub submission_deadline: Option<DateTime<Utc>>,
}

/// Chair-editable settings; every field optional, only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateConferenceSettings {
    pub name: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub submission_deadline: Option<DateTime<Utc>>,
    pub review_deadline: Option<DateTime<Utc>>,
    pub rebuttal_deadline: Option<DateTime<Utc>>,
    pub decision_deadline: Option<DateTime<Utc>>,
    pub reviewers_per_paper: Option<i64>,
    pub registration_fee_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Conference {
    pub async fn create(
        pool: &SqlitePool,
        chair_id: Uuid,
        data: &CreateConference,
    ) -> Result<Self, ConferenceError> {
        let conference = sqlx::query_as::<_, Conference>(
            r#"
            INSERT INTO conferences (id, chair_id, name, venue, description,
                                     start_date, end_date, submission_deadline)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chair_id)
        .bind(&data.name)
        .bind(&data.venue)
        .bind(&data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.submission_deadline)
        .fetch_one(pool)
        .await?;

        Ok(conference)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>("SELECT * FROM conferences WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Approved conferences plus any the caller chairs.
    pub async fn list_visible(
        pool: &SqlitePool,
        viewer_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Conference>(
            r#"
            SELECT * FROM conferences
            WHERE is_approved = 1 OR chair_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(pool)
        .await
    }

    pub async fn approve(pool: &SqlitePool, id: Uuid) -> Result<Self, ConferenceError> {
        sqlx::query_as::<_, Conference>(
            r#"
            UPDATE conferences
            SET is_approved = 1, updated_at = datetime('now','subsec')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ConferenceError::NotFound)
    }

    pub async fn update_settings(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateConferenceSettings,
    ) -> Result<Self, ConferenceError> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(ConferenceError::NotFound)?;

        let conference = sqlx::query_as::<_, Conference>(
            r#"
            UPDATE conferences
            SET name = ?2, venue = ?3, description = ?4, start_date = ?5, end_date = ?6,
                submission_deadline = ?7, review_deadline = ?8, rebuttal_deadline = ?9,
                decision_deadline = ?10, reviewers_per_paper = ?11, registration_fee_cents = ?12,
                updated_at = datetime('now','subsec')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_ref().unwrap_or(&existing.name))
        .bind(data.venue.as_ref().or(existing.venue.as_ref()))
        .bind(data.description.as_ref().or(existing.description.as_ref()))
        .bind(data.start_date.or(existing.start_date))
        .bind(data.end_date.or(existing.end_date))
        .bind(data.submission_deadline.or(existing.submission_deadline))
        .bind(data.review_deadline.or(existing.review_deadline))
        .bind(data.rebuttal_deadline.or(existing.rebuttal_deadline))
        .bind(data.decision_deadline.or(existing.decision_deadline))
        .bind(data.reviewers_per_paper.unwrap_or(existing.reviewers_per_paper))
        .bind(
            data.registration_fee_cents
                .unwrap_or(existing.registration_fee_cents),
        )
        .fetch_one(pool)
        .await?;

        Ok(conference)
    }

    pub async fn add_pc_member(
        pool: &SqlitePool,
        conference_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pc_members (id, conference_id, user_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(conference_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conference_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn is_pc_member(
        pool: &SqlitePool,
        conference_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pc_members WHERE conference_id = ?1 AND user_id = ?2",
        )
        .bind(conference_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}

impl Track {
    pub async fn create(
        pool: &SqlitePool,
        conference_id: Uuid,
        name: &str,
    ) -> Result<Self, ConferenceError> {
        let track = sqlx::query_as::<_, Track>(
            r#"
            INSERT INTO tracks (id, conference_id, name)
            VALUES (?1, ?2, ?3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conference_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ConferenceError::DuplicateTrack
            }
            _ => ConferenceError::Database(e),
        })?;

        Ok(track)
    }

    pub async fn find_by_conference(
        pool: &SqlitePool,
        conference_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Track>(
            "SELECT * FROM tracks WHERE conference_id = ?1 ORDER BY name",
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{create_test_conference, create_test_user, setup_test_pool};

    #[tokio::test]
    async fn create_approve_and_list() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let other = create_test_user(&pool, "other").await;

        let conference = create_test_conference(&pool, chair.id).await;
        assert!(!conference.is_approved);

        // Unapproved conferences are invisible to non-chairs.
        let visible = Conference::list_visible(&pool, other.id).await.unwrap();
        assert!(visible.is_empty());
        let own = Conference::list_visible(&pool, chair.id).await.unwrap();
        assert_eq!(own.len(), 1);

        let approved = Conference::approve(&pool, conference.id).await.unwrap();
        assert!(approved.is_approved);

        let visible = Conference::list_visible(&pool, other.id).await.unwrap();
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn settings_update_preserves_unset_fields() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let conference = create_test_conference(&pool, chair.id).await;

        let updated = Conference::update_settings(
            &pool,
            conference.id,
            &UpdateConferenceSettings {
                reviewers_per_paper: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.reviewers_per_paper, 5);
        assert_eq!(updated.name, conference.name);
    }

    #[tokio::test]
    async fn tracks_are_unique_per_conference() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let conference = create_test_conference(&pool, chair.id).await;

        Track::create(&pool, conference.id, "Systems").await.unwrap();
        let dup = Track::create(&pool, conference.id, "Systems").await;
        assert!(matches!(dup, Err(ConferenceError::DuplicateTrack)));
    }

    #[tokio::test]
    async fn pc_membership_is_idempotent() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let member = create_test_user(&pool, "member").await;
        let conference = create_test_conference(&pool, chair.id).await;

        Conference::add_pc_member(&pool, conference.id, member.id).await.unwrap();
        Conference::add_pc_member(&pool, conference.id, member.id).await.unwrap();

        assert!(Conference::is_pc_member(&pool, conference.id, member.id).await.unwrap());
        assert!(!Conference::is_pc_member(&pool, conference.id, chair.id).await.unwrap());
    }
}
