//! Session guard for protected routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::warn;

use super::error::ApiError;
use crate::auth::AuthState;
use crate::state::AppState;

/// The authenticated user, inserted into request extensions by
/// [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
}

/// Reject requests without a valid session cookie with 403.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = state.cookie.session_token(&jar);
    match state.sessions.authorize(token.as_deref()) {
        AuthState::Authenticated(username) => {
            request.extensions_mut().insert(CurrentUser { username });
            Ok(next.run(request).await)
        }
        AuthState::Anonymous => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "rejected request without a valid session"
            );
            Err(ApiError::forbidden())
        }
    }
}
