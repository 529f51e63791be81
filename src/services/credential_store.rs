// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for the credential pair.
//!
//! The pair is kept under three stable keys (`token`, `refresh_token`,
//! `user_data`). A document lacking any one of them is treated as "no
//! session". Writers replace or remove the whole document at once, so no
//! reader ever sees half of a pair.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ClientError, Result};
use crate::models::{CredentialPair, UserIdentity};

/// Storage backend for the credential pair.
pub trait CredentialStore: Send + Sync {
    /// Replace whatever is stored with `pair`.
    fn save(&self, pair: &CredentialPair) -> Result<()>;
    /// Load the stored pair; `None` when nothing (or only part of a pair) is stored.
    fn load(&self) -> Result<Option<CredentialPair>>;
    /// Remove every key.
    fn clear(&self) -> Result<()>;
}

/// On-disk layout, one entry per storage key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// JSON-encoded `UserIdentity`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_data: Option<String>,
}

impl StoredKeys {
    fn from_pair(pair: &CredentialPair) -> Result<Self> {
        let user_data = serde_json::to_string(&pair.user)
            .map_err(|e| ClientError::Storage(format!("Failed to encode user data: {}", e)))?;
        Ok(Self {
            token: Some(pair.access_token.clone()),
            refresh_token: Some(pair.refresh_token.clone()),
            user_data: Some(user_data),
        })
    }

    fn into_pair(self) -> Option<CredentialPair> {
        let (Some(access_token), Some(refresh_token), Some(user_data)) =
            (self.token, self.refresh_token, self.user_data)
        else {
            return None;
        };
        let user: UserIdentity = serde_json::from_str(&user_data).ok()?;
        if access_token.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(CredentialPair {
            access_token,
            refresh_token,
            user,
        })
    }
}

/// File-backed store; survives process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes writers within this process; the rename makes each write atomic on disk.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ClientError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, pair: &CredentialPair) -> Result<()> {
        let body = serde_json::to_vec_pretty(&StoredKeys::from_pair(pair)?)
            .map_err(|e| ClientError::Storage(format!("Failed to encode credentials: {}", e)))?;

        let _guard = self.lock()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ClientError::Storage(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, body)
            .map_err(|e| ClientError::Storage(format!("Failed to write credentials: {}", e)))?;
        restrict_permissions(&tmp);
        fs::rename(&tmp, &self.path)
            .map_err(|e| ClientError::Storage(format!("Failed to replace credentials: {}", e)))?;

        tracing::debug!(path = %self.path.display(), user = %pair.user.username, "Credentials saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<CredentialPair>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "Failed to read credentials: {}",
                    e
                )))
            }
        };

        let keys: StoredKeys = match serde_json::from_slice(&raw) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "Unreadable credential file ignored");
                return Ok(None);
            }
        };

        let pair = keys.into_pair();
        if pair.is_none() {
            tracing::debug!(path = %self.path.display(), "Partial credentials ignored");
        }
        Ok(pair)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!(
                "Failed to remove credentials: {}",
                e
            ))),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!(error = %e, "Failed to restrict credential file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// Process-local store for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryCredentialStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<CredentialPair>>> {
        self.pair
            .lock()
            .map_err(|_| ClientError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, pair: &CredentialPair) -> Result<()> {
        *self.slot()? = Some(pair.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<CredentialPair>> {
        Ok(self.slot()?.clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
