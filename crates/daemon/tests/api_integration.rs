//! End-to-end tests for the HTTP API.
//!
//! These tests drive the full router in-process:
//! - Login, logout and the session guard
//! - Listing, mkdir, upload, download and delete
//! - Path confinement at the HTTP boundary
//! - Password changes

use std::fs;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use daemon::config::{Config, MIN_BCRYPT_COST};
use daemon::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----filegate-test-boundary";

struct TestApp {
    router: Router,
    root: TempDir,
    _data: TempDir,
}

/// Create an app rooted in a fresh temporary directory.
fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

fn create_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let root = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();

    let mut config = Config::default();
    config.server.root_dir = root.path().to_path_buf();
    config.session.secret = "integration-test-secret".to_string();
    config.auth.credentials_file = data.path().join("credentials.json");
    config.auth.bcrypt_cost = MIN_BCRYPT_COST;
    customize(&mut config);
    config.validate().unwrap();

    let state = Arc::new(AppState::from_config(&config).unwrap());
    TestApp {
        router: daemon::api::router(state),
        root,
        _data: data,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in with the default account and return the `Cookie` header value.
    async fn login(&self) -> String {
        let response = self
            .send(json_request("POST", "/api/login", None, json!({
                "username": "admin",
                "password": "admin123",
            })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn upload_request(cookie: &str, path: Option<&str>, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
    if let Some(path) = path {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"path\"\r\n\r\n{path}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// `name=value` of the Set-Cookie header, ready to send back.
fn session_cookie(response: &Response) -> Option<String> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    set_cookie.split(';').next().map(str::to_string)
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn assert_error(response: Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    let body = body_json(response).await;
    body["error"]
        .as_str()
        .expect("error envelope has an error field")
        .to_string()
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_login_sets_http_only_cookie() {
    let app = create_test_app();
    let response = app
        .send(json_request("POST", "/api/login", None, json!({
            "username": "admin",
            "password": "admin123",
        })))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("filegate_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert_eq!(body_json(response).await, json!({"message": "Login successful"}));
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = create_test_app();
    let response = app
        .send(json_request("POST", "/api/login", None, json!({
            "username": "admin",
            "password": "wrong",
        })))
        .await;

    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_error(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn test_login_with_malformed_body() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let message = assert_error(app.send(request).await, StatusCode::BAD_REQUEST).await;
    assert!(message.starts_with("Invalid request"));
}

#[tokio::test]
async fn test_session_status() {
    let app = create_test_app();

    let response = app.send(get_request("/api/session", None)).await;
    assert_eq!(body_json(response).await, json!({"authenticated": false}));

    let cookie = app.login().await;
    let response = app.send(get_request("/api/session", Some(&cookie))).await;
    assert_eq!(
        body_json(response).await,
        json!({"authenticated": true, "username": "admin"})
    );
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = create_test_app();
    let requests = vec![
        get_request("/api/files", None),
        get_request("/api/download?path=a.txt", None),
        json_request("POST", "/api/mkdir", None, json!({"path": "", "name": "x"})),
        json_request("DELETE", "/api/delete", None, json!({"path": "x"})),
        json_request("POST", "/api/logout", None, json!({})),
        json_request("POST", "/api/change-password", None, json!({
            "oldPassword": "admin123",
            "newPassword": "whatever",
        })),
        get_request("/api/files", Some("filegate_session=forged.cookie")),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
    assert!(!app.root.path().join("x").exists());
}

#[tokio::test]
async fn test_unsigned_session_token_refused() {
    let app = create_test_app();
    let cookie = app.login().await;

    // Signed value is the MAC followed by the 64-hex-digit token.
    let (name, value) = cookie.split_once('=').unwrap();
    let token = &value[value.len() - 64..];
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let response = app.send(get_request("/api/files", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bare = format!("{name}={token}");
    let response = app.send(get_request("/api/files", Some(&bare))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(get_request("/api/session", Some(&bare))).await;
    assert_eq!(body_json(response).await["authenticated"], false);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app();
    let response = app.send(get_request("/api/nope", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(json_request("POST", "/api/logout", Some(&cookie), json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let response = app.send(get_request("/api/files", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(json_request("POST", "/api/change-password", Some(&cookie), json!({
            "oldPassword": "not-it",
            "newPassword": "brand-new",
        })))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .send(json_request("POST", "/api/change-password", Some(&cookie), json!({
            "oldPassword": "admin123",
            "newPassword": "short",
        })))
        .await;
    let message = assert_error(response, StatusCode::BAD_REQUEST).await;
    assert!(message.contains("at least 6"));

    let response = app
        .send(json_request("POST", "/api/change-password", Some(&cookie), json!({
            "oldPassword": "admin123",
            "newPassword": "brand-new",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The current session survives the change.
    let response = app.send(get_request("/api/files", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(json_request("POST", "/api/login", None, json!({
            "username": "admin",
            "password": "admin123",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request("POST", "/api/login", None, json!({
            "username": "admin",
            "password": "brand-new",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_ends_other_sessions() {
    let app = create_test_app();
    let current = app.login().await;
    let other = app.login().await;

    let response = app
        .send(json_request("POST", "/api/change-password", Some(&current), json!({
            "oldPassword": "admin123",
            "newPassword": "rotated-pw",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get_request("/api/files", Some(&other))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Listing Tests
// =============================================================================

#[tokio::test]
async fn test_list_root() {
    let app = create_test_app();
    fs::create_dir(app.root.path().join("docs")).unwrap();
    fs::write(app.root.path().join("readme.txt"), "hello").unwrap();
    let cookie = app.login().await;

    let response = app.send(get_request("/api/files?path=", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["path"], ".");
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "docs");
    assert_eq!(files[0]["isDir"], true);
    assert_eq!(files[1]["name"], "readme.txt");
    assert_eq!(files[1]["size"], 5);
    assert_eq!(files[1]["isDir"], false);
    assert!(files[1]["modTime"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_list_without_query_lists_root() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app.send(get_request("/api/files", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["path"], ".");
}

#[tokio::test]
async fn test_list_traversal_rejected() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(get_request("/api/files?path=../..", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .send(get_request("/api/files?path=%2Fetc", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
async fn test_list_missing_directory() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(get_request("/api/files?path=ghost", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::NOT_FOUND).await;
}

// =============================================================================
// Mkdir / Delete Tests
// =============================================================================

#[tokio::test]
async fn test_mkdir_list_delete_flow() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(json_request("POST", "/api/mkdir", Some(&cookie), json!({
            "path": ".",
            "name": "sub",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Directory created successfully"})
    );
    assert!(app.root.path().join("sub").is_dir());

    let response = app.send(get_request("/api/files?path=sub", Some(&cookie))).await;
    let body = body_json(response).await;
    assert_eq!(body["path"], "sub");
    assert_eq!(body["files"], json!([]));

    let response = app.send(get_request("/api/files?path=.", Some(&cookie))).await;
    let body = body_json(response).await;
    assert_eq!(body["files"][0]["name"], "sub");
    assert_eq!(body["files"][0]["isDir"], true);

    let response = app
        .send(json_request("DELETE", "/api/delete", Some(&cookie), json!({"path": "sub"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!app.root.path().join("sub").exists());

    let response = app.send(get_request("/api/files", Some(&cookie))).await;
    assert_eq!(body_json(response).await["files"], json!([]));
}

#[tokio::test]
async fn test_mkdir_rejects_traversal_name() {
    let app = create_test_app();
    let cookie = app.login().await;

    for name in ["..", "../escape", "a/b"] {
        let response = app
            .send(json_request("POST", "/api/mkdir", Some(&cookie), json!({
                "path": "",
                "name": name,
            })))
            .await;
        assert_error(response, StatusCode::BAD_REQUEST).await;
    }
    assert_eq!(fs::read_dir(app.root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_delete_root_refused() {
    let app = create_test_app();
    fs::write(app.root.path().join("keep.txt"), "x").unwrap();
    let cookie = app.login().await;

    for path in [".", "./", "sub/.."] {
        let response = app
            .send(json_request("DELETE", "/api/delete", Some(&cookie), json!({"path": path})))
            .await;
        assert_error(response, StatusCode::FORBIDDEN).await;
    }

    let response = app
        .send(json_request("DELETE", "/api/delete", Some(&cookie), json!({"path": ""})))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    assert!(app.root.path().join("keep.txt").exists());
}

#[tokio::test]
async fn test_delete_outside_root_refused() {
    let app = create_test_app();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("victim.txt"), "x").unwrap();
    let cookie = app.login().await;

    let response = app
        .send(json_request("DELETE", "/api/delete", Some(&cookie), json!({
            "path": outside.path().join("victim.txt"),
        })))
        .await;
    assert_error(response, StatusCode::FORBIDDEN).await;
    assert!(outside.path().join("victim.txt").exists());
}

// =============================================================================
// Upload / Download Tests
// =============================================================================

#[tokio::test]
async fn test_upload_then_download() {
    let app = create_test_app();
    fs::create_dir(app.root.path().join("docs")).unwrap();
    let cookie = app.login().await;

    let response = app
        .send(upload_request(&cookie, Some("docs"), "notes.txt", b"some notes"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "File uploaded successfully"})
    );
    assert_eq!(
        fs::read(app.root.path().join("docs/notes.txt")).unwrap(),
        b"some notes"
    );

    let response = app
        .send(get_request("/api/download?path=docs/notes.txt", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert_eq!(headers[header::CONTENT_LENGTH], "10");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment; filename=\"notes.txt\""));
    assert_eq!(body_bytes(response).await, b"some notes");
}

#[tokio::test]
async fn test_upload_without_path_goes_to_root() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(upload_request(&cookie, None, "top.bin", &[0u8, 1, 2, 3]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        fs::read(app.root.path().join("top.bin")).unwrap(),
        vec![0u8, 1, 2, 3]
    );
}

#[tokio::test]
async fn test_upload_traversal_filename_rejected() {
    let app = create_test_app();
    let cookie = app.login().await;

    let response = app
        .send(upload_request(&cookie, Some(""), "../../etc/passwd", b"root::0:0"))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(fs::read_dir(app.root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = create_test_app_with(|config| config.files.max_upload_size = 16);
    let cookie = app.login().await;

    let response = app
        .send(upload_request(&cookie, None, "big.bin", &[7u8; 100]))
        .await;
    assert_error(response, StatusCode::PAYLOAD_TOO_LARGE).await;
    assert!(!app.root.path().join("big.bin").exists());
}

#[tokio::test]
async fn test_download_errors() {
    let app = create_test_app();
    fs::create_dir(app.root.path().join("dir")).unwrap();
    let cookie = app.login().await;

    let response = app.send(get_request("/api/download?path=", Some(&cookie))).await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .send(get_request("/api/download?path=dir", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;

    let response = app
        .send(get_request("/api/download?path=missing.txt", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::NOT_FOUND).await;

    let response = app
        .send(get_request("/api/download?path=../../etc/passwd", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_download_through_escaping_symlink_refused() {
    let app = create_test_app();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), app.root.path().join("link")).unwrap();
    let cookie = app.login().await;

    let response = app
        .send(get_request("/api/download?path=link/secret.txt", Some(&cookie)))
        .await;
    assert_error(response, StatusCode::FORBIDDEN).await;
}
