//! Session-cookie authentication
//!
//! Login verifies the argon2 hash through the user repository and sets an
//! HttpOnly cookie; the middleware resolves the cookie against the
//! sessions table on every protected request.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::{COOKIE, SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metadata::repositories::{SessionRepository, UserRepository};
use serde::{Deserialize, Serialize};

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "idlens_session";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub username: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Response> {
    let user = UserRepository::get_by_username(state.db.pool(), &request.username)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::Unauthorized("unknown or inactive user".to_string()))?;

    let valid = UserRepository::verify_password(&user, &request.password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let session =
        SessionRepository::create(state.db.pool(), &user.id, state.config.session_ttl_secs).await?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        SESSION_COOKIE, session.id
    );
    let body = Json(LoginResponse {
        user_id: user.id,
        username: user.username,
    });
    Ok(([(SET_COOKIE, cookie)], body).into_response())
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    if let Some(session_id) = session_cookie(&request) {
        SessionRepository::delete(state.db.pool(), &session_id).await?;
    }
    let cookie = format!("{}=; Max-Age=0; Path=/", SESSION_COOKIE);
    Ok(([(SET_COOKIE, cookie)], Json(serde_json::json!({"ok": true}))).into_response())
}

/// Middleware guarding every endpoint except `/health` and `/auth/login`
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session_id = match session_cookie(&request) {
        Some(id) => id,
        None => {
            return ApiError::Unauthorized("missing session cookie".to_string()).into_response()
        }
    };

    match SessionRepository::get_valid(state.db.pool(), &session_id).await {
        Ok(Some(_)) => next.run(request).await,
        Ok(None) => {
            ApiError::Unauthorized("session expired or unknown".to_string()).into_response()
        }
        Err(error) => ApiError::from(error).into_response(),
    }
}

fn session_cookie(request: &Request) -> Option<String> {
    let header = request.headers().get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn cookie_parsing_finds_the_session_pair() {
        let request = HttpRequest::builder()
            .header(COOKIE, "theme=dark; idlens_session=abc123; lang=en")
            .body(Body::empty())
            .unwrap();
        assert_eq!(session_cookie(&request).as_deref(), Some("abc123"));

        let without = HttpRequest::builder()
            .header(COOKIE, "theme=dark")
            .body(Body::empty())
            .unwrap();
        assert!(session_cookie(&without).is_none());
    }
}
