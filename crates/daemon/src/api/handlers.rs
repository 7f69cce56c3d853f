//! Request handlers for the `/api` routes.
//!
//! Filesystem and bcrypt work runs on the blocking pool.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use bytes::Bytes;
use protocol::{
    ChangePasswordRequest, DeleteRequest, DirectoryResponse, LoginRequest, MkdirRequest,
    PathQuery, SessionStatus, SuccessResponse,
};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use super::error::ApiError;
use super::middleware::CurrentUser;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Run `f` on the blocking pool.
async fn blocking<T, E, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// `POST /login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: SignedCookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(SignedCookieJar, Json<SuccessResponse>)> {
    let Json(request) = body?;
    let username = request.username.clone();

    let app = Arc::clone(&state);
    let token = blocking(move || app.login(&request.username, &request.password))
        .await?
        .ok_or_else(|| {
            warn!(username = %username, "login failed");
            ApiError::unauthenticated("Invalid credentials")
        })?;
    info!(username = %username, "login succeeded");

    Ok((
        jar.add(state.cookie.issue(token)),
        Json(SuccessResponse::new("Login successful")),
    ))
}

/// `POST /logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<SuccessResponse>) {
    state
        .sessions
        .logout(state.cookie.session_token(&jar).as_deref());
    info!(username = %user.username, "logout");

    (
        jar.remove(state.cookie.removal()),
        Json(SuccessResponse::new("Logout successful")),
    )
}

/// `GET /session`
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    jar: SignedCookieJar,
) -> Json<SessionStatus> {
    let token = state.cookie.session_token(&jar);
    let auth = state.sessions.authorize(token.as_deref());
    Json(SessionStatus {
        authenticated: auth.is_authenticated(),
        username: auth.username().map(str::to_owned),
    })
}

/// `GET /files?path=`
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ApiResult<Json<DirectoryResponse>> {
    let Query(PathQuery { path }) = query?;

    let listing = blocking(move || state.browser.list_directory(&path)).await?;
    Ok(Json(listing.to_protocol()))
}

/// `POST /upload` (multipart: `file`, optional `path`)
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<SuccessResponse>> {
    let mut directory = String::new();
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("path") => directory = field.text().await?,
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((file_name, data));
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| ApiError::invalid_request("Missing file field"))?;
    let size = data.len();

    let stored = blocking(move || state.transfer.upload(&directory, &file_name, &data)).await?;
    info!(
        username = %user.username,
        path = %stored.relative(),
        size,
        "file uploaded"
    );

    Ok(Json(SuccessResponse::new("File uploaded successfully")))
}

/// `GET /download?path=`
pub async fn download(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(PathQuery { path }) = query?;

    let download = blocking(move || state.transfer.open_download(&path)).await?;
    info!(
        username = %user.username,
        path = %download.path.relative(),
        size = download.size,
        "file download"
    );

    let mime = mime_guess::from_path(&download.file_name).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str()).map_err(ApiError::internal)?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(download.size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&download.file_name))
            .map_err(ApiError::internal)?,
    );

    let file = tokio::fs::File::from_std(download.file);
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// `POST /mkdir`
pub async fn mkdir(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<MkdirRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(MkdirRequest { path, name }) = body?;

    let created = blocking(move || state.transfer.create_directory(&path, &name)).await?;
    info!(username = %user.username, path = %created.relative(), "directory created");

    Ok(Json(SuccessResponse::new("Directory created successfully")))
}

/// `DELETE /delete`
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(DeleteRequest { path }) = body?;

    let deleted = blocking(move || state.transfer.delete(&path)).await?;
    info!(username = %user.username, path = %deleted.relative(), "deleted");

    Ok(Json(SuccessResponse::new("Deleted successfully")))
}

/// `POST /change-password`
///
/// Other sessions of the same user are ended; the caller stays logged in.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    jar: SignedCookieJar,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(request) = body?;

    let store = Arc::clone(&state);
    blocking(move || {
        store
            .credentials
            .change_password(&request.old_password, &request.new_password)
    })
    .await?;

    let current = state.cookie.session_token(&jar);
    let revoked = state
        .sessions
        .revoke_others(&user.username, current.as_deref());
    info!(username = %user.username, revoked, "password changed");

    Ok(Json(SuccessResponse::new("Password changed successfully")))
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// UTF-8 name in `filename*`.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
