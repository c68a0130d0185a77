use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Review not found")]
    NotFound,
    #[error("A review by this reviewer already exists for the paper")]
    AlreadyExists,
    #[error("Review has no pending recommendation to approve")]
    NoRecommendation,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Accept,
    Reject,
}

/// One reviewer's verdict on one paper. `decision` is what aggregation
/// counts; `recommendation` is a subreviewer's proposal awaiting PC
/// approval and is invisible to the decision rule until approved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub reviewer_id: Uuid,
    pub decision: Option<ReviewDecision>,
    pub recommendation: Option<ReviewDecision>,
    pub rating: i64,
    pub confidence: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertReview {
    pub decision: Option<ReviewDecision>,
    pub rating: i64,
    pub confidence: i64,
    pub comment: Option<String>,
}

/// Counts over a paper's decided reviews, input to `Paper::decide`.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ReviewTally {
    pub accepts: i64,
    pub rejects: i64,
    pub decided: i64,
}

impl Review {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_paper(
        pool: &SqlitePool,
        paper_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE paper_id = ?1 ORDER BY created_at",
        )
        .bind(paper_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_paper_and_reviewer(
        pool: &SqlitePool,
        paper_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE paper_id = ?1 AND reviewer_id = ?2",
        )
        .bind(paper_id)
        .bind(reviewer_id)
        .fetch_optional(pool)
        .await
    }

    /// Create or update the reviewer's review with a direct decision.
    /// The UNIQUE(paper_id, reviewer_id) index backs the one-review rule.
    pub async fn upsert_decision(
        pool: &SqlitePool,
        paper_id: Uuid,
        reviewer_id: Uuid,
        data: &UpsertReview,
    ) -> Result<Self, ReviewError> {
        if let Some(existing) =
            Self::find_by_paper_and_reviewer(pool, paper_id, reviewer_id).await?
        {
            let review = sqlx::query_as::<_, Review>(
                r#"
                UPDATE reviews
                SET decision = ?2, rating = ?3, confidence = ?4, comment = ?5,
                    updated_at = datetime('now','subsec')
                WHERE id = ?1
                RETURNING *
                "#,
            )
            .bind(existing.id)
            .bind(data.decision)
            .bind(data.rating)
            .bind(data.confidence)
            .bind(&data.comment)
            .fetch_one(pool)
            .await?;
            return Ok(review);
        }

        Self::insert(pool, paper_id, reviewer_id, data.decision, None, data).await
    }

    /// Create or update the reviewer's review as a subreviewer
    /// recommendation. Never touches `decision`.
    pub async fn upsert_recommendation(
        pool: &SqlitePool,
        paper_id: Uuid,
        reviewer_id: Uuid,
        recommendation: ReviewDecision,
        data: &UpsertReview,
    ) -> Result<Self, ReviewError> {
        if let Some(existing) =
            Self::find_by_paper_and_reviewer(pool, paper_id, reviewer_id).await?
        {
            let review = sqlx::query_as::<_, Review>(
                r#"
                UPDATE reviews
                SET recommendation = ?2, rating = ?3, confidence = ?4, comment = ?5,
                    updated_at = datetime('now','subsec')
                WHERE id = ?1
                RETURNING *
                "#,
            )
            .bind(existing.id)
            .bind(recommendation)
            .bind(data.rating)
            .bind(data.confidence)
            .bind(&data.comment)
            .fetch_one(pool)
            .await?;
            return Ok(review);
        }

        Self::insert(pool, paper_id, reviewer_id, None, Some(recommendation), data).await
    }

    async fn insert(
        pool: &SqlitePool,
        paper_id: Uuid,
        reviewer_id: Uuid,
        decision: Option<ReviewDecision>,
        recommendation: Option<ReviewDecision>,
        data: &UpsertReview,
    ) -> Result<Self, ReviewError> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, paper_id, reviewer_id, decision, recommendation,
                                 rating, confidence, comment)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(paper_id)
        .bind(reviewer_id)
        .bind(decision)
        .bind(recommendation)
        .bind(data.rating)
        .bind(data.confidence)
        .bind(&data.comment)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ReviewError::AlreadyExists,
            _ => ReviewError::Database(e),
        })
    }

    /// Promote a subreviewer recommendation into the counted decision.
    pub async fn approve_recommendation(
        pool: &SqlitePool,
        review_id: Uuid,
    ) -> Result<Self, ReviewError> {
        let approved = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET decision = recommendation, updated_at = datetime('now','subsec')
            WHERE id = ?1 AND recommendation IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(review_id)
        .fetch_optional(pool)
        .await?;

        match approved {
            Some(review) => Ok(review),
            None => match Self::find_by_id(pool, review_id).await? {
                Some(_) => Err(ReviewError::NoRecommendation),
                None => Err(ReviewError::NotFound),
            },
        }
    }

    pub async fn tally_for_paper(
        pool: &SqlitePool,
        paper_id: Uuid,
    ) -> Result<ReviewTally, sqlx::Error> {
        sqlx::query_as::<_, ReviewTally>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN decision = 'accept' THEN 1 ELSE 0 END), 0) AS accepts,
                COALESCE(SUM(CASE WHEN decision = 'reject' THEN 1 ELSE 0 END), 0) AS rejects,
                COALESCE(SUM(CASE WHEN decision IS NOT NULL THEN 1 ELSE 0 END), 0) AS decided
            FROM reviews
            WHERE paper_id = ?1
            "#,
        )
        .bind(paper_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_utils::{
        create_test_conference, create_test_paper, create_test_user, setup_test_pool,
    };

    #[tokio::test]
    async fn one_review_per_reviewer_per_paper() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let reviewer = create_test_user(&pool, "reviewer").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let first = Review::upsert_decision(
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

        // Second submission updates in place rather than inserting.
        let second = Review::upsert_decision(
            &pool,
            paper.id,
            reviewer.id,
            &UpsertReview {
                decision: Some(ReviewDecision::Reject),
                rating: 2,
                confidence: 3,
                comment: Some("changed my mind".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.decision, Some(ReviewDecision::Reject));

        let all = Review::find_by_paper(&pool, paper.id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn recommendation_does_not_count_until_approved() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let sub = create_test_user(&pool, "subreviewer").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let review = Review::upsert_recommendation(
            &pool,
            paper.id,
            sub.id,
            ReviewDecision::Accept,
            &UpsertReview {
                decision: None,
                rating: 4,
                confidence: 2,
                comment: Some("looks solid".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(review.decision, None);
        let tally = Review::tally_for_paper(&pool, paper.id).await.unwrap();
        assert_eq!(tally.decided, 0);

        let approved = Review::approve_recommendation(&pool, review.id).await.unwrap();
        assert_eq!(approved.decision, Some(ReviewDecision::Accept));

        let tally = Review::tally_for_paper(&pool, paper.id).await.unwrap();
        assert_eq!((tally.accepts, tally.decided), (1, 1));
    }

    #[tokio::test]
    async fn approving_without_recommendation_fails() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let reviewer = create_test_user(&pool, "reviewer").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        let review = Review::upsert_decision(
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

        let result = Review::approve_recommendation(&pool, review.id).await;
        assert!(matches!(result, Err(ReviewError::NoRecommendation)));

        let missing = Review::approve_recommendation(&pool, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ReviewError::NotFound)));
    }

    #[tokio::test]
    async fn tally_ignores_undecided_reviews() {
        let pool = setup_test_pool().await;
        let chair = create_test_user(&pool, "chair").await;
        let author = create_test_user(&pool, "author").await;
        let r1 = create_test_user(&pool, "rev1").await;
        let r2 = create_test_user(&pool, "rev2").await;
        let conference = create_test_conference(&pool, chair.id).await;
        let paper = create_test_paper(&pool, conference.id, author.id).await;

        Review::upsert_decision(
            &pool,
            paper.id,
            r1.id,
            &UpsertReview {
                decision: None,
                rating: 3,
                confidence: 3,
                comment: None,
            },
        )
        .await
        .unwrap();
        Review::upsert_decision(
            &pool,
            paper.id,
            r2.id,
            &UpsertReview {
                decision: Some(ReviewDecision::Reject),
                rating: 2,
                confidence: 4,
                comment: None,
            },
        )
        .await
        .unwrap();

        let tally = Review::tally_for_paper(&pool, paper.id).await.unwrap();
        assert_eq!((tally.accepts, tally.rejects, tally.decided), (0, 1, 1));
    }
}
