//! Client-side credential and session storage.
//!
//! Two scopes of key-value storage back the client:
//!
//! - **Persistent** ([`FileStore`]): survives restarts. Holds the bearer
//!   token under [`TOKEN_KEY`] and the display profile under [`PROFILE_KEY`].
//! - **Session** ([`MemoryStore`]): lives as long as the process. Holds the
//!   selected company under [`SELECTED_COMPANY_KEY`].
//!
//! [`SessionStore`] ties both scopes together and is the only type the auth
//! gate and CLI talk to.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Persistent key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Persistent key holding the display profile (JSON).
pub const PROFILE_KEY: &str = "user";

/// Session key holding the selected company id.
pub const SELECTED_COMPANY_KEY: &str = "selectedCompany";

/// File name of the persistent store inside the state directory.
pub const STORAGE_FILE_NAME: &str = "storage.json";

// =============================================================================
// Key-Value Store Trait
// =============================================================================

/// String key-value storage.
///
/// Implementations must be thread-safe; every method takes `&self`.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store used for session-scoped state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Persistent store backed by a single JSON object on disk.
///
/// Every operation re-reads the file so that separate processes sharing a
/// state directory observe each other's logins and logouts. Writes go to a
/// sibling temporary file that is renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a store at `<state_dir>/storage.json`.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(STORAGE_FILE_NAME))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(data) if data.is_empty() => Ok(HashMap::new()),
            Ok(data) => {
                serde_json::from_slice(&data).map_err(|e| StoreError::Corrupted(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let data =
            serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Persisted storage");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// Session Store
// =============================================================================

/// Display profile stored alongside the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Credential and session-context storage for one client.
#[derive(Clone)]
pub struct SessionStore {
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store over a persistent and a session-scoped store.
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// A store where both scopes live in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// The stored bearer token, if any. Blank values count as absent.
    pub fn credential(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .persistent
            .get(TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    /// Store a freshly issued token and its display profile.
    pub fn save_login(&self, token: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let profile =
            serde_json::to_string(profile).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        self.persistent.set(TOKEN_KEY, token)?;
        self.persistent.set(PROFILE_KEY, &profile)
    }

    /// The stored display profile, if any.
    pub fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        match self.persistent.get(PROFILE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupted(e.to_string())),
            None => Ok(None),
        }
    }

    /// The selected company for this session, if any.
    pub fn selected_company(&self) -> Result<Option<String>, StoreError> {
        self.session.get(SELECTED_COMPANY_KEY)
    }

    /// Select the company subsequent report views operate on.
    pub fn select_company(&self, company_id: &str) -> Result<(), StoreError> {
        self.session.set(SELECTED_COMPANY_KEY, company_id)
    }

    /// Remove the credential and all state that depends on it.
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// error is returned.
    pub fn purge(&self) -> Result<(), StoreError> {
        let results = [
            self.persistent.remove(TOKEN_KEY),
            self.persistent.remove(PROFILE_KEY),
            self.session.remove(SELECTED_COMPANY_KEY),
        ];
        results.into_iter().collect()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
