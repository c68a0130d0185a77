use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use db::models::{
    session::Session,
    user::{CreateUser, User, UserError},
};
use db::services::AuthService;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{
    AppState,
    error::ApiError,
    middleware::{auth::session_token_from_headers, get_current_user},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    full_name: String,
    affiliation: Option<String>,
}

/// POST /auth/register
///
/// Creates the account unverified and emails a one-time code. The account
/// cannot log in until the code is redeemed.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.username.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Username and email are required".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".into(),
        ));
    }

    let password_hash = AuthService::hash_password(&payload.password)
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = User::create(
        &state.db.pool,
        &CreateUser {
            username: payload.username,
            email: payload.email,
            password_hash,
            full_name: payload.full_name,
            affiliation: payload.affiliation,
        },
    )
    .await?;

    let code = AuthService::generate_otp_code();
    db::models::user::EmailOtp::create(&state.db.pool, user.id, &AuthService::hash_otp_code(&code))
        .await?;
    state
        .notifier
        .send_email(
            &user.email,
            "Verify your email address",
            &format!(
                "Hello {},\n\nYour verification code is {}. It expires in 10 minutes.",
                user.full_name, code
            ),
        )
        .await;

    tracing::info!("Registered user {} ({})", user.username, user.id);
    Ok(ResponseJson(ApiResponse::success_with_message(
        user,
        "Verification code sent",
    )))
}

#[derive(Debug, Deserialize)]
struct VerifyOtpRequest {
    email: String,
    code: String,
}

/// POST /auth/verify-otp
async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let user = User::find_by_email(&state.db.pool, &payload.email)
        .await?
        .ok_or(UserError::InvalidOtp)?;

    db::models::user::EmailOtp::consume(
        &state.db.pool,
        user.id,
        &AuthService::hash_otp_code(&payload.code),
    )
    .await?;
    User::mark_email_verified(&state.db.pool, user.id).await?;

    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Email verified",
    )))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// POST /auth/login
///
/// Accepts a username or an email in the `username` field. Sets the
/// session cookie on success.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let pool = &state.db.pool;

    let user = match User::find_by_username(pool, &payload.username).await? {
        Some(user) => Some(user),
        None => User::find_by_email(pool, &payload.username).await?,
    };

    // Same error for unknown user and bad password.
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());
    let user = user.ok_or_else(invalid)?;

    let password_ok = AuthService::verify_password(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(format!("Password verification failed: {}", e)))?;
    if !password_ok {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("User account is inactive".into()));
    }
    if !user.email_verified {
        return Err(ApiError::Forbidden(
            "Email address has not been verified".into(),
        ));
    }

    let token = AuthService::generate_session_token();
    Session::create(pool, user.id, &AuthService::hash_session_token(&token)).await?;
    User::touch_last_login(pool, user.id).await?;

    let cookie = format!(
        "session_id={}; HttpOnly; Path=/; SameSite=Lax; Max-Age=2592000",
        token
    );
    let mut response = ResponseJson(ApiResponse::success(user)).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))?,
    );
    Ok(response)
}

/// POST /auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token_from_headers(&headers) {
        Session::delete_by_token_hash(&state.db.pool, &AuthService::hash_session_token(&token))
            .await?;
    }

    let mut response =
        ResponseJson(ApiResponse::success_with_message((), "Logged out")).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session_id=; HttpOnly; Path=/; Max-Age=0"),
    );
    Ok(response)
}

/// GET /auth/me
async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let ctx = get_current_user(&state, &headers).await?;
    let user = User::find_by_id(&state.db.pool, ctx.user_id)
        .await?
        .ok_or(UserError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(user)))
}
