use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    conference::Conference,
    invite::{InviteError, PcInvite, ReviewInvite, SubreviewerInvite},
};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::get_current_user,
    routes::{
        conferences::{require_chair, require_committee},
        papers::load_paper,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conferences/{id}/invites/pc", post(invite_pc_member))
        .route("/papers/{id}/invites/review", post(invite_reviewer))
        .route("/papers/{id}/invites/subreviewer", post(invite_subreviewer))
        .route("/invites/{token}", get(get_invite))
        .route("/invites/{token}/accept", post(accept_invite))
        .route("/invites/{token}/decline", post(decline_invite))
        .route("/invites/{token}/cancel", post(cancel_invite))
}

#[derive(Debug, Deserialize)]
struct InviteRequest {
    email: String,
}

/// The three invite kinds behind one token namespace, so a single link
/// format works for all of them.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyInvite {
    Pc(PcInvite),
    Review(ReviewInvite),
    Subreviewer(SubreviewerInvite),
}

async fn find_any_invite(state: &AppState, token: &str) -> Result<AnyInvite, ApiError> {
    let pool = &state.db.pool;
    if let Some(invite) = PcInvite::find_by_token(pool, token).await? {
        return Ok(AnyInvite::Pc(invite));
    }
    if let Some(invite) = ReviewInvite::find_by_token(pool, token).await? {
        return Ok(AnyInvite::Review(invite));
    }
    if let Some(invite) = SubreviewerInvite::find_by_token(pool, token).await? {
        return Ok(AnyInvite::Subreviewer(invite));
    }
    Err(InviteError::NotFound.into())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email address is required".into()));
    }
    Ok(())
}

async fn send_invite_email(state: &AppState, email: &str, token: &str, subject: &str, intro: &str) {
    let link = format!("{}/invites/{}", state.config.public_base_url, token);
    state
        .notifier
        .send_email(
            email,
            subject,
            &format!("{}\n\nRespond to the invitation here: {}", intro, link),
        )
        .await;
}

/// POST /conferences/{id}/invites/pc
async fn invite_pc_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conference_id): Path<Uuid>,
    Json(payload): Json<InviteRequest>,
) -> Result<ResponseJson<ApiResponse<PcInvite>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let conference = require_chair(&state, &ctx, conference_id).await?;
    validate_email(&payload.email)?;

    let invite =
        PcInvite::create(&state.db.pool, conference_id, ctx.user_id, payload.email.trim()).await?;
    send_invite_email(
        &state,
        &invite.email,
        &invite.token,
        "Program committee invitation",
        &format!(
            "You have been invited to join the program committee of {}.",
            conference.name
        ),
    )
    .await;

    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// POST /papers/{id}/invites/review
async fn invite_reviewer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
    Json(payload): Json<InviteRequest>,
) -> Result<ResponseJson<ApiResponse<ReviewInvite>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;
    require_chair(&state, &ctx, paper.conference_id).await?;
    validate_email(&payload.email)?;

    let invite =
        ReviewInvite::create(&state.db.pool, paper_id, ctx.user_id, payload.email.trim()).await?;
    send_invite_email(
        &state,
        &invite.email,
        &invite.token,
        "Review invitation",
        &format!("You have been asked to review \"{}\".", paper.title),
    )
    .await;

    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// POST /papers/{id}/invites/subreviewer
///
/// PC members delegate a paper to an outside subreviewer; the chair may
/// do the same.
async fn invite_subreviewer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(paper_id): Path<Uuid>,
    Json(payload): Json<InviteRequest>,
) -> Result<ResponseJson<ApiResponse<SubreviewerInvite>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let paper = load_paper(&state, paper_id).await?;
    require_committee(&state, &ctx, paper.conference_id).await?;
    validate_email(&payload.email)?;

    let invite =
        SubreviewerInvite::create(&state.db.pool, paper_id, ctx.user_id, payload.email.trim())
            .await?;
    send_invite_email(
        &state,
        &invite.email,
        &invite.token,
        "Subreview invitation",
        &format!(
            "A program committee member asked you to subreview \"{}\".",
            paper.title
        ),
    )
    .await;

    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// GET /invites/{token}
///
/// Token-bearer lookup, no session required; invitees usually have no
/// account yet.
async fn get_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AnyInvite>>, ApiError> {
    let invite = find_any_invite(&state, &token).await?;
    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// POST /invites/{token}/accept
///
/// Requires a session so the acceptance binds to an account. Accepting a
/// PC invite also registers the member on the committee.
async fn accept_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AnyInvite>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let pool = &state.db.pool;

    match find_any_invite(&state, &token).await? {
        AnyInvite::Pc(invite) => {
            PcInvite::accept(pool, invite.id, ctx.user_id).await?;
            Conference::add_pc_member(pool, invite.conference_id, ctx.user_id).await?;
            state
                .notifier
                .notify_user(
                    pool,
                    invite.invited_by,
                    "Invitation accepted",
                    &format!("{} accepted your program committee invitation.", invite.email),
                )
                .await;
        }
        AnyInvite::Review(invite) => {
            ReviewInvite::accept(pool, invite.id, ctx.user_id).await?;
            state
                .notifier
                .notify_user(
                    pool,
                    invite.invited_by,
                    "Invitation accepted",
                    &format!("{} accepted your review invitation.", invite.email),
                )
                .await;
        }
        AnyInvite::Subreviewer(invite) => {
            SubreviewerInvite::accept(pool, invite.id, ctx.user_id).await?;
            state
                .notifier
                .notify_user(
                    pool,
                    invite.pc_member_id,
                    "Invitation accepted",
                    &format!("{} accepted your subreview invitation.", invite.email),
                )
                .await;
        }
    }

    let invite = find_any_invite(&state, &token).await?;
    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// POST /invites/{token}/decline
///
/// Token-only, like the lookup. Declining must not require registration.
async fn decline_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AnyInvite>>, ApiError> {
    let pool = &state.db.pool;
    match find_any_invite(&state, &token).await? {
        AnyInvite::Pc(invite) => PcInvite::decline(pool, invite.id).await?,
        AnyInvite::Review(invite) => ReviewInvite::decline(pool, invite.id).await?,
        AnyInvite::Subreviewer(invite) => SubreviewerInvite::decline(pool, invite.id).await?,
    }

    let invite = find_any_invite(&state, &token).await?;
    Ok(ResponseJson(ApiResponse::success(invite)))
}

/// POST /invites/{token}/cancel
///
/// Only the issuer (or a superuser) may withdraw a pending invite.
async fn cancel_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AnyInvite>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let pool = &state.db.pool;

    let issuer_only = |issuer: Uuid| -> Result<(), ApiError> {
        if issuer != ctx.user_id && !ctx.is_superuser {
            return Err(ApiError::Forbidden(
                "Only the inviter may cancel this invite".to_string(),
            ));
        }
        Ok(())
    };

    match find_any_invite(&state, &token).await? {
        AnyInvite::Pc(invite) => {
            issuer_only(invite.invited_by)?;
            PcInvite::cancel(pool, invite.id).await?;
        }
        AnyInvite::Review(invite) => {
            issuer_only(invite.invited_by)?;
            ReviewInvite::cancel(pool, invite.id).await?;
        }
        AnyInvite::Subreviewer(invite) => {
            issuer_only(invite.pc_member_id)?;
            SubreviewerInvite::cancel(pool, invite.id).await?;
        }
    }

    let invite = find_any_invite(&state, &token).await?;
    Ok(ResponseJson(ApiResponse::success(invite)))
}
