//! # FileGate Protocol Library
//!
//! Wire types shared by the FileGate daemon and its clients.
//!
//! ## Overview
//!
//! - **Messages**: JSON request and response bodies of the `/api` routes
//! - **Error codes**: the error taxonomy and its HTTP status mapping
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{ErrorCode, ErrorResponse};
//!
//! let body = ErrorResponse::new("Invalid path");
//! assert_eq!(ErrorCode::Traversal.http_status(), 400);
//! assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"Invalid path"}"#);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: API message definitions
//! - [`error`]: Error codes and their HTTP statuses

pub mod error;
pub mod messages;

pub use error::ErrorCode;
pub use messages::{
    ChangePasswordRequest, DeleteRequest, DirectoryResponse, ErrorResponse, FileEntry,
    LoginRequest, MkdirRequest, PathQuery, SessionStatus, SuccessResponse, API_PREFIX,
};
