//! Cookie-carried session identity.
//!
//! The middleware resolves the caller's [`SessionId`] from the session cookie,
//! or issues a fresh one, and stashes it in the request extensions. Handlers
//! pick it up through the [`CurrentSession`] extractor.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use shared::{
    domain::SessionId,
    error::{ApiError, ErrorCode},
};
use tracing::{debug, warn};

use crate::app_state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CurrentSession(pub(crate) SessionId);

pub(crate) async fn resolve_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = session_from_headers(request.headers(), &state.session_cookie);
    let (session_id, issued) = match existing {
        Some(session_id) => (session_id, false),
        None => {
            let session_id = SessionId::generate();
            debug!(%session_id, "issuing new session");
            (session_id, true)
        }
    };
    request.extensions_mut().insert(CurrentSession(session_id));

    let mut response = next.run(request).await;
    if issued {
        match HeaderValue::from_str(&session_cookie(&state.session_cookie, session_id)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(error) => warn!(%error, "session cookie is not a valid header value"),
        }
    }
    response
}

/// First cookie named `cookie_name` that holds a well-formed session id.
pub(crate) fn session_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| *name == cookie_name)
        .find_map(|(_, value)| value.trim_matches('"').parse().ok())
}

pub(crate) fn session_cookie(cookie_name: &str, session_id: SessionId) -> String {
    format!("{cookie_name}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .copied()
            .ok_or_else(|| {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiError::new(
                        ErrorCode::SessionUnavailable,
                        "session not found in request; is the session middleware installed?",
                    )),
                )
            })
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
