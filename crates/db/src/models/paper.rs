use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

use super::review::{Review, ReviewTally};

#[derive(Debug, Error)]
pub enum PaperError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Paper not found")]
    NotFound,
    #[error("Submission deadline has passed")]
    DeadlinePassed,
    #[error("Conference is not accepting submissions")]
    ConferenceNotOpen,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaperStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaperStatus::Submitted => write!(f, "submitted"),
            PaperStatus::Accepted => write!(f, "accepted"),
            PaperStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Paper {
    pub id: Uuid,
    pub conference_id: Uuid,
    pub track_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub abstract_text: String,
    pub file_path: Option<String>,
    pub status: PaperStatus,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaper {
    pub title: String,
    pub abstract_text: String,
    pub file_path: Option<String>,
    pub track_id: Option<Uuid>,
}

/// One row of the chair's CSV export, papers joined with review tallies.
#[derive(Debug, Serialize, FromRow)]
pub struct PaperExportRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub track: Option<String>,
    pub status: PaperStatus,
    pub accepts: i64,
    pub rejects: i64,
    pub decided: i64,
    pub is_paid: bool,
}

impl Paper {
    /// The decision rule over a paper's decided reviews.
    ///
    /// Two accepts win outright. Rejection needs a strict majority of at
    /// least two decided reviews; a single lone reject keeps the paper
    /// submitted so one negative review never sinks it early.
    pub fn decide(tally: &ReviewTally) -> PaperStatus {
        if tally.accepts >= 2 {
            PaperStatus::Accepted
        } else if tally.decided >= 2 && tally.rejects > tally.accepts {
            PaperStatus::Rejected
        } else {
            PaperStatus::Submitted
        }
    }

    pub async fn create(
        pool: &SqlitePool,
        conference_id: Uuid,
        author_id: Uuid,
        data: &CreatePaper,
    ) -> Result<Self, PaperError> {
        let paper = sqlx::query_as::<_, Paper>(
            r#"
            INSERT INTO papers (id, conference_id, track_id, author_id, title, abstract_text, file_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conference_id)
        .bind(data.track_id)
        .bind(author_id)
        .bind(&data.title)
        .bind(&data.abstract_text)
        .bind(&data.file_path)
        .fetch_one(pool)
        .await?;

        Ok(paper)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>("SELECT * FROM papers WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_conference(
        pool: &SqlitePool,
        conference_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>(
            "SELECT * FROM papers WHERE conference_id = ?1 ORDER BY created_at DESC",
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_author(
        pool: &SqlitePool,
        author_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Paper>(
            "SELECT * FROM papers WHERE author_id = ?1 ORDER BY created_at DESC",
        )
        .bind(author_id)
        .fetch_all(pool)
        .await
    }

    /// Direct status write, used by the chair override.
    pub async fn set_status(
        pool: &SqlitePool,
        id: Uuid,
        status: PaperStatus,
    ) -> Result<Self, PaperError> {
        sqlx::query_as::<_, Paper>(
            r#"
            UPDATE papers
            SET status = ?2, updated_at = datetime('now','subsec')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?
        .ok_or(PaperError::NotFound)
    }

    /// Re-derive status from the paper's decided reviews.
    ///
    /// Only ever moves a paper out of `submitted`; a status already set by
    /// aggregation or a chair override is left alone. Returns the new status
    /// when a transition happened.
    pub async fn apply_aggregation(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<PaperStatus>, PaperError> {
        let paper = Self::find_by_id(pool, id).await?.ok_or(PaperError::NotFound)?;
        if paper.status != PaperStatus::Submitted {
            return Ok(None);
        }

        let tally = Review::tally_for_paper(pool, id).await?;
        let next = Self::decide(&tally);
        if next == PaperStatus::Submitted {
            return Ok(None);
        }

        Self::set_status(pool, id, next).await?;
        Ok(Some(next))
    }

    pub async fn mark_paid(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE papers SET is_paid = 1, updated_at = datetime('now','subsec') WHERE id = ?1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn export_rows(
        pool: &SqlitePool,
        conference_id: Uuid,
    ) -> Result<Vec<PaperExportRow>, sqlx::Error> {
        sqlx::query_as::<_, PaperExportRow>(
            r#"
            SELECT
                p.id,
                p.title,
                u.username AS author,
                t.name AS track,
                p.status,
                COALESCE(SUM(CASE WHEN r.decision = 'accept' THEN 1 ELSE 0 END), 0) AS accepts,
                COALESCE(SUM(CASE WHEN r.decision = 'reject' THEN 1 ELSE 0 END), 0) AS rejects,
                COALESCE(SUM(CASE WHEN r.decision IS NOT NULL THEN 1 ELSE 0 END), 0) AS decided,
                p.is_paid
            FROM papers p
            JOIN users u ON p.author_id = u.id
            LEFT JOIN tracks t ON p.track_id = t.id
            LEFT JOIN reviews r ON r.paper_id = p.id
            WHERE p.conference_id = ?1
            GROUP BY p.id
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(conference_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::{ReviewDecision, UpsertReview};
    use crate::models::test_utils::{
        create_test_conference, create_test_paper, create_test_user, setup_test_pool,
    };

    fn tally(accepts: i64, rejects: i64) -> ReviewTally {
        ReviewTally {
            accepts,
            rejects,
            decided: accepts + rejects,
        }
    }

    #[test]
    fn two_accepts_accept_the_paper() {
        assert_eq!(Paper::decide(&tally(2, 0)), PaperStatus::Accepted);
        assert_eq!(Paper::decide(&tally(2, 1)), PaperStatus::Accepted);
        assert_eq!(Paper::decide(&tally(3, 5)), PaperStatus::Accepted);
    }

    #[test]
    fn reject_majority_rejects_with_quorum() {
        assert_eq!(Paper::decide(&tally(0, 2)), PaperStatus::Rejected);
        assert_eq!(Paper::decide(&tally(1, 2)), PaperStatus::Rejected);
        assert_eq!(Paper::decide(&tally(1, 3)), PaperStatus::Rejected);
    }

    #[test]
    fn single_reject_stays_submitted() {
        assert_eq!(Paper::decide(&tally(0, 1)), PaperStatus::Submitted);
    }

    #[test]
    fn undecided_states_stay_submitted() {
        assert_eq!(Paper::decide(&tally(0, 0)), PaperStatus::Submitted);
        assert_eq!(Paper::decide(&tally(1, 0)), PaperStatus::Submitted);
        assert_eq!(Paper::decide(&tally(1, 1)), PaperStatus::Submitted);
    }

    #[tokio::test]
    async fn aggregation_accepts_after_two_accepts() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let r1 = create_test_user(&pool, "rev1").await;
        let r2 = create_test_user(&pool, "rev2").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        for reviewer in [&r1, &r2] {
            Review::upsert_decision(
                &pool,
                paper.id,
                reviewer.id,
                &UpsertReview {
                    decision: Some(ReviewDecision::Accept),
                    rating: 4,
                    confidence: 3,
                    comment: None,
                },
            )
            .await
            .unwrap();
        }

        let transition = Paper::apply_aggregation(&pool, paper.id).await.unwrap();
        assert_eq!(transition, Some(PaperStatus::Accepted));

        let paper = Paper::find_by_id(&pool, paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, PaperStatus::Accepted);
    }

    #[tokio::test]
    async fn aggregation_keeps_single_reject_submitted() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let r1 = create_test_user(&pool, "rev1").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        Review::upsert_decision(
            &pool,
            paper.id,
            r1.id,
            &UpsertReview {
                decision: Some(ReviewDecision::Reject),
                rating: 2,
                confidence: 4,
                comment: Some("not convinced".into()),
            },
        )
        .await
        .unwrap();

        let transition = Paper::apply_aggregation(&pool, paper.id).await.unwrap();
        assert_eq!(transition, None);

        let paper = Paper::find_by_id(&pool, paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, PaperStatus::Submitted);
    }

    #[tokio::test]
    async fn aggregation_never_flips_an_override() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let r1 = create_test_user(&pool, "rev1").await;
        let r2 = create_test_user(&pool, "rev2").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        // Chair accepts despite the reviews to come.
        Paper::set_status(&pool, paper.id, PaperStatus::Accepted).await.unwrap();

        for reviewer in [&r1, &r2] {
            Review::upsert_decision(
                &pool,
                paper.id,
                reviewer.id,
                &UpsertReview {
                    decision: Some(ReviewDecision::Reject),
                    rating: 1,
                    confidence: 5,
                    comment: None,
                },
            )
            .await
            .unwrap();
        }

        let transition = Paper::apply_aggregation(&pool, paper.id).await.unwrap();
        assert_eq!(transition, None);

        let paper = Paper::find_by_id(&pool, paper.id).await.unwrap().unwrap();
        assert_eq!(paper.status, PaperStatus::Accepted);
    }

    #[tokio::test]
    async fn export_rows_carry_tallies() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let r1 = create_test_user(&pool, "rev1").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        Review::upsert_decision(
            &pool,
            paper.id,
            r1.id,
            &UpsertReview {
                decision: Some(ReviewDecision::Accept),
                rating: 5,
                confidence: 5,
                comment: None,
            },
        )
        .await
        .unwrap();

        let rows = Paper::export_rows(&pool, conference.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].accepts, 1);
        assert_eq!(rows[0].decided, 1);
        assert_eq!(rows[0].author, "author");
    }
}
