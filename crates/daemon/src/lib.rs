//! # FileGate Daemon Library
//!
//! This crate provides the server side of FileGate: a small HTTP service that
//! exposes one directory tree to an authenticated user.
//!
//! ## Overview
//!
//! - **Path Confinement**: every client path is resolved against a single root
//!   and refused if it could leave it
//! - **File Operations**: list, upload, download, mkdir and delete
//! - **Authentication**: bcrypt credentials and cookie sessions
//! - **HTTP API**: axum router under `/api`
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    HTTP API (axum)                       │
//! │   login / session        require_session ──► handlers    │
//! ├───────────────────────────┬──────────────────────────────┤
//! │   Auth                    │   Files                      │
//! │   SessionStore            │   DirectoryBrowser           │
//! │   CredentialStore         │   FileTransfer               │
//! │                           │        │                     │
//! │                           │   PathResolver (pure)        │
//! └───────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     Server::new(&config)?
//!         .run(daemon::server::shutdown_signal())
//!         .await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution, browsing and transfer
//! - [`auth`]: Credentials, sessions and cookies
//! - [`api`]: HTTP routes, handlers and error responses
//! - [`server`]: Listener lifecycle and graceful shutdown
//! - [`logging`]: Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod config;
pub mod files;
pub mod logging;
pub mod server;
pub mod state;

// Re-export protocol for convenience
pub use protocol;

pub use config::Config;
pub use server::Server;
pub use state::AppState;

pub use auth::{AuthState, CredentialStore, SessionStore};
pub use files::{
    DirectoryBrowser, DirectoryEntry, FileError, FileTransfer, Operation, PathRejection,
    PathResolver, ResolvedPath,
};
