//! HTTP API.
//!
//! All routes live under [`protocol::API_PREFIX`]. `POST /login` and
//! `GET /session` are public; every other route requires a session cookie.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::ApiError;
pub use middleware::CurrentUser;

use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// State of the API routes.
///
/// Handlers extract `State<Arc<AppState>>`; the signed cookie jar takes its
/// [`Key`] from here.
#[derive(Clone)]
pub struct ApiState(Arc<AppState>);

impl FromRef<ApiState> for Arc<AppState> {
    fn from_ref(state: &ApiState) -> Self {
        Arc::clone(&state.0)
    }
}

impl FromRef<ApiState> for Key {
    fn from_ref(state: &ApiState) -> Self {
        state.0.cookie.key().clone()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.transfer.max_upload_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let protected = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/files", get(handlers::list_files))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/download", get(handlers::download))
        .route("/mkdir", post(handlers::mkdir))
        .route("/delete", delete(handlers::delete_entry))
        .route("/change-password", post(handlers::change_password))
        .route_layer(axum::middleware::from_fn_with_state(
            ApiState(Arc::clone(&state)),
            middleware::require_session,
        ));

    let api = Router::new()
        .route("/login", post(handlers::login))
        .route("/session", get(handlers::session_status))
        .merge(protected);

    let mut app = Router::new()
        .nest(protocol::API_PREFIX, api)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.cors_origins) {
        app = app.layer(cors);
    }

    app.with_state(ApiState(state))
}

/// CORS for the configured origins, with credentials so the session cookie
/// is sent. `None` when no origin is configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}
