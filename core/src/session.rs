//! Access/refresh token storage.
//!
//! # Design
//! A `Session` is an explicit object handed to `AuthClient::new` rather than
//! process-wide state, so tests and hosts can run several isolated sessions.
//! The tokens live in a `TokenStore` under the well-known keys `access` and
//! `refresh`; stores are synchronous. `Session` serializes access to its
//! store with a mutex and is shared through `Arc`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "access";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh";

/// A token store could not persist a change.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding token file failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Synchronous key/value storage for session tokens.
pub trait TokenStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Volatile store; tokens vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: HashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as a flat JSON object, rewritten on every change.
///
/// A missing file is an empty store. A file that cannot be read or parsed is
/// also treated as empty, with a warning, so a corrupt file forces a fresh
/// login instead of failing every request.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load(&path);
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "saved session tokens");
        Ok(())
    }
}

fn load(path: &Path) -> HashMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read token file");
            return HashMap::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to parse token file");
        HashMap::new()
    })
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// The client's credentials: an optional access token and an optional
/// refresh token.
pub struct Session {
    store: Mutex<Box<dyn TokenStore>>,
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    fn store(&self) -> MutexGuard<'_, Box<dyn TokenStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn access_token(&self) -> Option<String> {
        self.store().get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store().get(REFRESH_TOKEN_KEY)
    }

    /// Stores both tokens, as issued by a login.
    pub fn store_tokens(&self, access: &str, refresh: &str) -> Result<(), StoreError> {
        let mut store = self.store();
        store.set(ACCESS_TOKEN_KEY, access)?;
        store.set(REFRESH_TOKEN_KEY, refresh)
    }

    pub fn set_access_token(&self, access: &str) -> Result<(), StoreError> {
        self.store().set(ACCESS_TOKEN_KEY, access)
    }

    /// Removes both tokens. Both removals are attempted even if the first
    /// fails; the first error is returned.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut store = self.store();
        let access = store.remove(ACCESS_TOKEN_KEY);
        let refresh = store.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }

    pub fn is_empty(&self) -> bool {
        let store = self.store();
        store.get(ACCESS_TOKEN_KEY).is_none() && store.get(REFRESH_TOKEN_KEY).is_none()
    }
}

impl std::fmt::Debug for Session {
    // Token values stay out of debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store();
        f.debug_struct("Session")
            .field("has_access", &store.get(ACCESS_TOKEN_KEY).is_some())
            .field("has_refresh", &store.get(REFRESH_TOKEN_KEY).is_some())
            .finish()
    }
}
