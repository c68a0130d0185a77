use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    conference::{Conference, ConferenceError},
    invite::{ReviewInvite, SubreviewerInvite},
    paper::Paper,
    review::{Review, ReviewError, UpsertReview},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::{AccessContext, get_current_user},
    routes::{
        conferences::{require_chair, require_committee},
        papers::{load_paper, notify_decision},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/papers/{id}/review", put(submit_review))
        .route("/papers/{id}/reviews", get(list_reviews))
        .route("/papers/{id}/aggregate", post(reaggregate))
        .route("/reviews/{id}/recommendation/approve", post(approve_recommendation))
}

enum ReviewerRole {
    /// Chair, PC member, or invited reviewer; writes a counted decision.
    Direct,
    /// Accepted subreviewer; writes a recommendation awaiting approval.
    Subreviewer,
}

/// Work out how the caller is allowed to review this paper. Authors are
/// refused outright, even when they hold another role.
async fn reviewer_role(
    state: &AppState,
    ctx: &AccessContext,
    paper: &Paper,
) -> Result<ReviewerRole, ApiError> {
    if paper.author_id == ctx.user_id {
        return Err(ApiError::Forbidden(
            "Authors cannot review their own paper".to_string(),
        ));
    }

    let conference = Conference::find_by_id(&state.db.pool, paper.conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if conference.chair_id == ctx.user_id
        || Conference::is_pc_member(&state.db.pool, paper.conference_id, ctx.user_id).await?
        || ReviewInvite::has_accepted(&state.db.pool, paper.id, ctx.user_id).await?
    {
        return Ok(ReviewerRole::Direct);
    }
    if SubreviewerInvite::has_accepted(&state.db.pool, paper.id, ctx.user_id).await? {
        return Ok(ReviewerRole::Subreviewer);
    }

    Err(ApiError::Forbidden(
        "No review assignment for this paper".to_string(),
    ))
}

fn validate_scores(data: &UpsertReview) -> Result<(), ApiError> {
    if !(1..=5).contains(&data.rating) {
        return Err(ApiError::BadRequest("rating must be between 1 and 5".into()));
    }
    if !(1..=5).contains(&data.confidence) {
        return Err(ApiError::BadRequest(
            "confidence must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

/// PUT /papers/{id}/review
///
/// Idempotent per reviewer: resubmitting replaces the earlier review. A
/// subreviewer's verdict lands as a recommendation and does not count
/// toward the paper's status until a PC member approves it.
async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
    Json(payload): Json<UpsertReview>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;
    let role = reviewer_role(&state, &ctx, &paper).await?;
    validate_scores(&payload)?;

    let review = match role {
        ReviewerRole::Direct => {
            Review::upsert_decision(&state.db.pool, paper_id, ctx.user_id, &payload).await?
        }
        ReviewerRole::Subreviewer => {
            let recommendation = payload.decision.ok_or_else(|| {
                ApiError::BadRequest("A recommendation requires a decision value".to_string())
            })?;
            Review::upsert_recommendation(
                &state.db.pool,
                paper_id,
                ctx.user_id,
                recommendation,
                &payload,
            )
            .await?
        }
    };

    run_aggregation(&state, paper_id).await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

/// GET /papers/{id}/reviews
async fn list_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Review>>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;
    require_committee(&state, &ctx, paper.conference_id).await?;

    let reviews = Review::find_by_paper(&state.db.pool, paper_id).await?;
    Ok(ResponseJson(ApiResponse::success(reviews)))
}

/// POST /reviews/{id}/recommendation/approve
///
/// A PC member (or chair) promotes a subreviewer recommendation into a
/// counted decision, then the paper is re-aggregated.
async fn approve_recommendation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(review_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Review>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let review = Review::find_by_id(&state.db.pool, review_id)
        .await?
        .ok_or(ReviewError::NotFound)?;
    let paper = load_paper(&state, review.paper_id).await?;
    require_committee(&state, &ctx, paper.conference_id).await?;

    let review = Review::approve_recommendation(&state.db.pool, review_id).await?;
    run_aggregation(&state, review.paper_id).await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

/// POST /papers/{id}/aggregate
///
/// Chair-triggered re-run of the decision rule, for reviews that changed
/// outside the usual submission path.
async fn reaggregate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;
    require_chair(&state, &ctx, paper.conference_id).await?;

    run_aggregation(&state, paper_id).await?;
    let paper = load_paper(&state, paper_id).await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// Re-derive the paper's status and notify the author and chair when it
/// changed.
async fn run_aggregation(state: &AppState, paper_id: Uuid) -> Result<(), ApiError> {
    let Some(new_status) = Paper::apply_aggregation(&state.db.pool, paper_id).await? else {
        return Ok(());
    };
    tracing::info!("Paper {} aggregated to {}", paper_id, new_status);

    let paper = load_paper(state, paper_id).await?;
    notify_decision(state, &paper).await;

    if let Some(conference) = Conference::find_by_id(&state.db.pool, paper.conference_id).await? {
        state
            .notifier
            .notify_user(
                &state.db.pool,
                conference.chair_id,
                "Paper decision reached",
                &format!("\"{}\" is now {}.", paper.title, paper.status),
            )
            .await;
    }
    Ok(())
}
