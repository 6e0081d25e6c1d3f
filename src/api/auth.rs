// =============================================================================
// Session Cookie Authentication — Axum Extractors
// =============================================================================
//
// The browser carries an opaque session id in the `dashboard_session`
// cookie.  Two extractors read it:
//
//   async fn handler(SessionCookie(id): SessionCookie, ...) { ... }
//   async fn handler(login: RequireLogin, ...) { ... }
//
// `SessionCookie` never rejects; it yields `None` when no cookie is sent.
// `RequireLogin` short-circuits the request with 401 Unauthorized unless the
// session's gate is `Authenticated`.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use tracing::debug;

use crate::api::error::ApiError;
use crate::app_state::AppState;
use crate::session::{GateState, SESSION_COOKIE};

// =============================================================================
// Cookie parsing
// =============================================================================

/// Find the session id among all `Cookie` headers of a request.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that stores `id` in the browser.
pub fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// `Set-Cookie` value that deletes the session cookie.
pub fn cleared_session_cookie() -> HeaderValue {
    HeaderValue::from_static("dashboard_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// =============================================================================
// Extractors
// =============================================================================

/// Session id sent by the browser, if any.
pub struct SessionCookie(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie(session_id_from_headers(&parts.headers)))
    }
}

/// A session whose gate is `Authenticated`.
pub struct RequireLogin {
    pub session_id: String,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequireLogin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(session_id) = session_id_from_headers(&parts.headers) else {
            debug!("request without session cookie");
            return Err(ApiError::Unauthorized("Please log in to view the dashboard.".into()));
        };

        match state.sessions.state(&session_id) {
            GateState::Authenticated { username } => Ok(RequireLogin {
                session_id,
                username,
            }),
            GateState::Anonymous => {
                debug!(session = %session_id, "anonymous session rejected");
                Err(ApiError::Unauthorized("Please log in to view the dashboard.".into()))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
