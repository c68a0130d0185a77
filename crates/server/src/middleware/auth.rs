use axum::http::{HeaderMap, header};
use db::models::session::Session;
use db::services::AuthService;

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "session_id";

/// Authenticated caller, resolved once per request from the session cookie
/// or a bearer token.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub user_id: uuid::Uuid,
    pub is_superuser: bool,
    pub is_active: bool,
    pub email_verified: bool,
}

impl AccessContext {
    pub fn require_superuser(&self) -> Result<(), ApiError> {
        if !self.is_superuser {
            return Err(ApiError::Forbidden("Superuser access required".to_string()));
        }
        Ok(())
    }

    pub fn require_active(&self) -> Result<(), ApiError> {
        if !self.is_active {
            return Err(ApiError::Forbidden("User account is inactive".to_string()));
        }
        Ok(())
    }
}

/// Resolve the caller from `Cookie: session_id=...` or
/// `Authorization: Bearer ...`. Tokens are stored hashed, so lookups hash
/// first.
pub async fn get_current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AccessContext, ApiError> {
    let pool = &state.db.pool;

    if let Some(token) = session_token_from_headers(headers) {
        let token_hash = AuthService::hash_session_token(&token);
        if let Some(session_user) = Session::find_user_by_token_hash(pool, &token_hash).await? {
            let ctx = AccessContext {
                user_id: session_user.user_id,
                is_superuser: session_user.is_superuser,
                is_active: session_user.is_active,
                email_verified: session_user.email_verified,
            };
            ctx.require_active()?;
            return Ok(ctx);
        }
    }

    Err(ApiError::Unauthorized(
        "Missing or invalid authentication".to_string(),
    ))
}

pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        if let Some(token) = extract_session_from_cookies(cookies) {
            return Some(token);
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn extract_session_from_cookies(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing_finds_the_session() {
        let cookies = "theme=dark; session_id=abc123; lang=en";
        assert_eq!(extract_session_from_cookies(cookies), Some("abc123".into()));
    }

    #[test]
    fn cookie_parsing_ignores_other_cookies() {
        assert_eq!(extract_session_from_cookies("theme=dark"), None);
        assert_eq!(extract_session_from_cookies(""), None);
    }

    #[test]
    fn bearer_token_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok-1".parse().unwrap());
        assert_eq!(session_token_from_headers(&headers), Some("tok-1".into()));
    }
}
