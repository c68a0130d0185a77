use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use chrono::Utc;
use db::models::{
    conference::{Conference, ConferenceError, Track},
    invite::{ReviewInvite, SubreviewerInvite},
    paper::{CreatePaper, Paper, PaperError, PaperStatus},
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::{AccessContext, get_current_user},
    routes::conferences::{require_chair, require_committee},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conferences/{id}/papers", post(submit_paper).get(list_conference_papers))
        .route("/papers/mine", get(list_my_papers))
        .route("/papers/{id}", get(get_paper))
        .route("/papers/{id}/decision", patch(decide_paper))
}

/// Author, conference chair, PC member, accepted reviewer or subreviewer,
/// or superuser.
pub(crate) async fn can_view_paper(
    state: &AppState,
    ctx: &AccessContext,
    paper: &Paper,
) -> Result<bool, ApiError> {
    if paper.author_id == ctx.user_id || ctx.is_superuser {
        return Ok(true);
    }
    let conference = Conference::find_by_id(&state.db.pool, paper.conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if conference.chair_id == ctx.user_id {
        return Ok(true);
    }
    if Conference::is_pc_member(&state.db.pool, paper.conference_id, ctx.user_id).await? {
        return Ok(true);
    }
    if ReviewInvite::has_accepted(&state.db.pool, paper.id, ctx.user_id).await? {
        return Ok(true);
    }
    if SubreviewerInvite::has_accepted(&state.db.pool, paper.id, ctx.user_id).await? {
        return Ok(true);
    }
    Ok(false)
}

pub(crate) async fn load_paper(state: &AppState, id: Uuid) -> Result<Paper, ApiError> {
    Ok(Paper::find_by_id(&state.db.pool, id)
        .await?
        .ok_or(PaperError::NotFound)?)
}

/// POST /conferences/{id}/papers
///
/// Submission requires an approved conference whose deadline has not
/// passed; a supplied track must belong to the conference.
async fn submit_paper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conference_id): Path<Uuid>,
    Json(payload): Json<CreatePaper>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;

    let conference = Conference::find_by_id(&state.db.pool, conference_id)
        .await?
        .ok_or(ConferenceError::NotFound)?;
    if !conference.is_approved {
        return Err(PaperError::ConferenceNotOpen.into());
    }
    if let Some(deadline) = conference.submission_deadline {
        if Utc::now() > deadline {
            return Err(PaperError::DeadlinePassed.into());
        }
    }
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Paper title is required".into()));
    }
    if let Some(track_id) = payload.track_id {
        let track = Track::find_by_id(&state.db.pool, track_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Unknown track".to_string()))?;
        if track.conference_id != conference_id {
            return Err(ApiError::BadRequest(
                "Track does not belong to this conference".into(),
            ));
        }
    }

    let paper = Paper::create(&state.db.pool, conference_id, ctx.user_id, &payload).await?;

    state
        .notifier
        .notify_user(
            &state.db.pool,
            conference.chair_id,
            "New paper submitted",
            &format!(
                "\"{}\" was submitted to {}.",
                paper.title, conference.name
            ),
        )
        .await;

    tracing::info!("Paper {} submitted to conference {}", paper.id, conference_id);
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// GET /conferences/{id}/papers
async fn list_conference_papers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conference_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    require_committee(&state, &ctx, conference_id).await?;

    let papers = Paper::find_by_conference(&state.db.pool, conference_id).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /papers/mine
async fn list_my_papers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let papers = Paper::find_by_author(&state.db.pool, ctx.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /papers/{id}
async fn get_paper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, id).await?;

    if !can_view_paper(&state, &ctx, &paper).await? {
        // Hide existence from outsiders.
        return Err(PaperError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::success(paper)))
}

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    status: PaperStatus,
}

/// PATCH /papers/{id}/decision
///
/// Chair override. Bypasses review aggregation entirely; aggregation never
/// undoes a status set here.
async fn decide_paper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, id).await?;
    require_chair(&state, &ctx, paper.conference_id).await?;

    let paper = Paper::set_status(&state.db.pool, id, payload.status).await?;
    notify_decision(&state, &paper).await;

    tracing::info!("Paper {} set to {} by {}", paper.id, paper.status, ctx.user_id);
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// Tell the author about a decision, whether it came from aggregation or
/// a chair override.
pub(crate) async fn notify_decision(state: &AppState, paper: &Paper) {
    let verdict = match paper.status {
        PaperStatus::Accepted => "accepted",
        PaperStatus::Rejected => "rejected",
        PaperStatus::Submitted => return,
    };
    state
        .notifier
        .notify_user(
            &state.db.pool,
            paper.author_id,
            &format!("Paper {}", verdict),
            &format!("Your paper \"{}\" has been {}.", paper.title, verdict),
        )
        .await;
}
