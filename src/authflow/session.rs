//! Bearer token storage.
//!
//! A token stored with `persistent = true` is written to the session file (mode
//! 0600) and survives restarts. A non-persistent token lives only in memory for
//! the current process and removes any durable token left by an earlier login.
//! The store knows nothing about auth semantics and never logs token material.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk layout; the token is keyed under `access_token`.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    token: Option<SecretString>,
    persistent: bool,
}

impl SessionStore {
    /// A store without a backing file; every token is session-only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store backed by `path`, loading a previously persisted token.
    /// A missing file is an empty store; an unreadable token file is ignored.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StoredSession>(&contents) {
                Ok(stored) if !stored.access_token.trim().is_empty() => {
                    debug!("loaded persisted session from {}", path.display());
                    Some(SecretString::from(stored.access_token))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("ignoring malformed session file {}: {e}", path.display());
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session file {}", path.display()))
            }
        };

        Ok(Self {
            persistent: token.is_some(),
            path: Some(path),
            token,
        })
    }

    #[must_use]
    pub fn get(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.token.is_some() && self.persistent
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stores `token`. The in-memory copy is always updated, even when writing the
    /// session file fails.
    ///
    /// # Errors
    /// Returns an error if the session file cannot be written or removed.
    pub fn set(&mut self, token: SecretString, persistent: bool) -> Result<()> {
        let result = match (&self.path, persistent) {
            (Some(path), true) => write_token(path, &token),
            (Some(path), false) => remove_file(path),
            (None, _) => Ok(()),
        };

        self.token = Some(token);
        self.persistent = persistent && self.path.is_some();
        result
    }

    /// Drops the token from memory and from disk.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be removed.
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.persistent = false;
        match &self.path {
            Some(path) => remove_file(path),
            None => Ok(()),
        }
    }
}

fn write_token(path: &Path, token: &SecretString) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string(&StoredSession {
        access_token: token.expose_secret().to_string(),
    })
    .context("Failed to serialize session")?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    // `mode` only applies on creation; an older file may be wider.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
    }
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
