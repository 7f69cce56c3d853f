//! Shared application state.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::auth::{AuthError, CookieSettings, CredentialStore, SessionStore};
use crate::config::Config;
use crate::files::{DirectoryBrowser, FileTransfer, PathResolver};

/// Everything a request handler needs, shared behind an `Arc`.
pub struct AppState {
    pub browser: DirectoryBrowser,
    pub transfer: FileTransfer,
    pub sessions: Arc<SessionStore>,
    pub credentials: CredentialStore,
    pub cookie: CookieSettings,
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Build the state from a validated configuration.
    ///
    /// Canonicalizes the root directory and loads the credential store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config.server.root_dir_or_cwd()?;
        let resolver = PathResolver::canonicalized(&root)
            .with_context(|| format!("Invalid root directory: {}", root.display()))?;

        let credentials = CredentialStore::open(
            &config.auth.credentials_file,
            &config.auth.default_username,
            &config.auth.default_password,
            config.auth.bcrypt_cost,
        )?;

        Ok(Self {
            browser: DirectoryBrowser::new(resolver.clone())
                .include_hidden(config.files.include_hidden),
            transfer: FileTransfer::new(resolver, config.files.max_upload_size),
            sessions: Arc::new(SessionStore::new(config.session.ttl())),
            credentials,
            cookie: CookieSettings::new(
                &config.session.cookie_name,
                &config.session.secret,
                config.session.ttl_secs,
                config.session.secure_cookie,
            ),
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Check credentials and, if they match, open a session.
    ///
    /// Returns the session token, or `None` when the credentials are
    /// wrong. Blocks for a bcrypt verification.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<String>, AuthError> {
        if !self.credentials.verify(username, password)? {
            return Ok(None);
        }
        Ok(Some(self.sessions.create(username)))
    }

    /// The canonical root directory.
    pub fn root(&self) -> &std::path::Path {
        self.browser.resolver().root()
    }
}
