//! Persistent credential storage.
//!
//! A single account is stored as JSON with a bcrypt hash of its password.
//! Files written by older releases hold the password in plain text; those
//! are re-hashed and rewritten the first time they are loaded.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest password accepted by [`CredentialStore::change_password`].
pub const MIN_PASSWORD_LEN: usize = 6;

/// Errors that can occur while checking or changing credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The supplied password does not match.
    #[error("current password is incorrect")]
    InvalidCredentials,

    /// The new password is too short.
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    /// Hashing or verification failed.
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The credential file could not be written.
    #[error("failed to persist credentials: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// Lock poisoned during operation.
    #[error("lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// On-disk record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialsFile {
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
    /// Plain-text password written by older releases.
    #[serde(default, skip_serializing)]
    password: Option<String>,
}

#[derive(Debug, Clone)]
struct Account {
    username: String,
    password_hash: String,
}

/// Credential store with a single account.
///
/// Reads take a shared lock; changing the password holds the write lock
/// across verification, hashing and the file write.
pub struct CredentialStore {
    path: PathBuf,
    account: RwLock<Account>,
    cost: u32,
}

impl CredentialStore {
    /// Load the store from `path`.
    ///
    /// A missing file yields the default account, which is kept in memory
    /// until the password is first changed.
    pub fn open(
        path: impl Into<PathBuf>,
        default_username: &str,
        default_password: &str,
        cost: u32,
    ) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                username = default_username,
                "Credential file not found, using default credentials; change the password after logging in"
            );
            let account = Account {
                username: default_username.to_string(),
                password_hash: bcrypt::hash(default_password, cost)
                    .context("Failed to hash default password")?,
            };
            return Ok(Self::with_account(path, account, cost));
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read credentials: {}", path.display()))?;
        let record: CredentialsFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials: {}", path.display()))?;

        match (record.password_hash, record.password) {
            (Some(password_hash), _) => {
                tracing::info!(path = %path.display(), "Loaded credentials");
                let account = Account {
                    username: record.username,
                    password_hash,
                };
                Ok(Self::with_account(path, account, cost))
            }
            (None, Some(plain)) => {
                let account = Account {
                    username: record.username,
                    password_hash: bcrypt::hash(&plain, cost)
                        .context("Failed to hash legacy password")?,
                };
                let store = Self::with_account(path, account.clone(), cost);
                write_record(&store.path, &account)?;
                tracing::info!(path = %store.path.display(), "Migrated plain-text credentials to bcrypt");
                Ok(store)
            }
            (None, None) => anyhow::bail!(
                "Credential file {} has no password_hash",
                path.display()
            ),
        }
    }

    fn with_account(path: PathBuf, account: Account, cost: u32) -> Self {
        Self {
            path,
            account: RwLock::new(account),
            cost,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn username(&self) -> Result<String, AuthError> {
        Ok(self.read()?.username.clone())
    }

    /// Check a login attempt.
    ///
    /// Blocks for the duration of a bcrypt verification.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let account = self.read()?.clone();
        let password_ok = bcrypt::verify(password, &account.password_hash)?;
        Ok(password_ok && account.username == username)
    }

    /// Replace the password after checking the current one, then persist.
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), AuthError> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let mut account = self.write()?;
        if !bcrypt::verify(old_password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let updated = Account {
            username: account.username.clone(),
            password_hash: bcrypt::hash(new_password, self.cost)?,
        };
        write_record(&self.path, &updated)?;
        *account = updated;

        tracing::info!(username = %account.username, "Password changed");
        Ok(())
    }

    /// Overwrite the account unconditionally.
    pub fn set_credentials(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let mut account = self.write()?;
        let updated = Account {
            username: username.to_string(),
            password_hash: bcrypt::hash(password, self.cost)?,
        };
        write_record(&self.path, &updated)?;
        *account = updated;
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Account>, AuthError> {
        self.account.read().map_err(|_| AuthError::LockPoisoned {
            context: "credentials read lock".to_string(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Account>, AuthError> {
        self.account.write().map_err(|_| AuthError::LockPoisoned {
            context: "credentials write lock".to_string(),
        })
    }
}

/// Write the account atomically (temp file, then rename).
fn write_record(path: &Path, account: &Account) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create credentials directory: {}", parent.display())
        })?;
    }

    let record = CredentialsFile {
        username: account.username.clone(),
        password_hash: Some(account.password_hash.clone()),
        password: None,
    };
    let contents =
        serde_json::to_string_pretty(&record).context("Failed to serialize credentials")?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &contents)
        .with_context(|| format!("Failed to write temp credentials: {}", temp_path.display()))?;
    restrict_permissions(&temp_path)?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename temp credentials {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    tracing::debug!(path = %path.display(), "Saved credentials");
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
