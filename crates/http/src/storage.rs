//! Durable client-side session storage
//!
//! Three keys are kept: `access_token`, `refresh_token`, and `user` (the
//! serialized profile). They are always written and cleared together through
//! a single [`StorageBatch`], so a reader never sees a refresh token paired
//! with a stale or missing access token.

use crate::client::error::ClientError;
use chamados_core::UserProfile;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";

/// Set of writes applied in one step; `None` removes the key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageBatch {
    entries: Vec<(String, Option<String>)>,
}

impl StorageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((key.to_string(), Some(value.into())));
        self
    }

    #[must_use]
    pub fn remove(mut self, key: &str) -> Self {
        self.entries.push((key.to_string(), None));
        self
    }

    pub fn entries(&self) -> &[(String, Option<String>)] {
        &self.entries
    }

    fn apply_to(self, map: &mut HashMap<String, String>) {
        for (key, value) in self.entries {
            match value {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
    }
}

/// Key/value store backing the session
#[cfg_attr(test, mockall::automock)]
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Apply every entry of `batch`, all or nothing
    fn apply(&self, batch: StorageBatch) -> Result<(), ClientError>;
}

/// Process-local storage; sessions do not survive a restart
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn apply(&self, batch: StorageBatch) -> Result<(), ClientError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        batch.apply_to(&mut values);
        Ok(())
    }
}

/// JSON file storage so that a session survives process restarts
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, ClientError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }

        // Write-then-rename keeps the previous file intact if we die mid-write
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(map)?;
        write_private(&tmp, &contents).map_err(|e| storage_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

fn storage_error(path: &Path, err: &std::io::Error) -> ClientError {
    ClientError::Storage(format!("{}: {err}", path.display()))
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn apply(&self, batch: StorageBatch) -> Result<(), ClientError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map().unwrap_or_else(|e| {
            warn!("Discarding unreadable session file: {e}");
            HashMap::new()
        });
        batch.apply_to(&mut map);
        if map.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(storage_error(&self.path, &e)),
            };
        }
        self.write_map(&map)
    }
}

/// Snapshot of everything stored for the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl StoredSession {
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

/// Typed view over a [`SessionStorage`]
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionStorage>) -> Self {
        Self { backend }
    }

    /// Read a key; storage failures are logged and read as absent
    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read '{key}' from session storage: {e}");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user profile is unreadable: {e}");
                None
            }
        }
    }

    pub fn snapshot(&self) -> StoredSession {
        StoredSession {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            user: self.user(),
        }
    }

    /// Persist a fresh login
    pub fn save_login(
        &self,
        access: &str,
        refresh: &str,
        user: &UserProfile,
    ) -> Result<(), ClientError> {
        let batch = StorageBatch::new()
            .set(ACCESS_TOKEN_KEY, access)
            .set(REFRESH_TOKEN_KEY, refresh)
            .set(USER_KEY, serde_json::to_string(user)?);
        self.backend.apply(batch)
    }

    /// Persist a refreshed access token, and the rotated refresh token if any
    pub fn save_access_token(&self, access: &str, refresh: Option<&str>) -> Result<(), ClientError> {
        let mut batch = StorageBatch::new().set(ACCESS_TOKEN_KEY, access);
        if let Some(refresh) = refresh {
            batch = batch.set(REFRESH_TOKEN_KEY, refresh);
        }
        self.backend.apply(batch)
    }

    pub fn save_user(&self, user: &UserProfile) -> Result<(), ClientError> {
        self.backend
            .apply(StorageBatch::new().set(USER_KEY, serde_json::to_string(user)?))
    }

    /// Remove all session keys in one step
    pub fn clear(&self) -> Result<(), ClientError> {
        debug!("Clearing stored session");
        self.backend.apply(
            StorageBatch::new()
                .remove(ACCESS_TOKEN_KEY)
                .remove(REFRESH_TOKEN_KEY)
                .remove(USER_KEY),
        )
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamados_core::Role;

    fn user() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "ana",
            "nome_completo": "Ana Lima",
            "tipo_usuario": "usuario"
        }))
        .unwrap()
    }

    #[test]
    fn memory_store_round_trip() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.snapshot().is_empty());

        store.save_login("a1", "r1", &user()).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.access_token.as_deref(), Some("a1"));
        assert_eq!(snap.refresh_token.as_deref(), Some("r1"));
        assert_eq!(snap.user.unwrap().role, Role::Requester);

        store.save_access_token("a2", None).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        store.clear().unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::new(Arc::new(FileStorage::new(&path)));
        store.save_login("a1", "r1", &user()).unwrap();
        assert!(path.exists());

        let reopened = SessionStore::new(Arc::new(FileStorage::new(&path)));
        assert_eq!(reopened.access_token().as_deref(), Some("a1"));
        assert_eq!(reopened.user().unwrap().username, "ana");

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert!(reopened.snapshot().is_empty());
    }

    #[test]
    fn corrupt_user_reads_as_absent() {
        let backend = Arc::new(MemoryStorage::new());
        backend
            .apply(StorageBatch::new().set(USER_KEY, "{not json"))
            .unwrap();
        let store = SessionStore::new(backend);
        assert!(store.user().is_none());
    }

    #[test]
    fn clear_removes_all_keys_in_one_batch() {
        let mut mock = MockSessionStorage::new();
        mock.expect_apply()
            .times(1)
            .withf(|batch| {
                batch.entries()
                    == [
                        (ACCESS_TOKEN_KEY.to_string(), None),
                        (REFRESH_TOKEN_KEY.to_string(), None),
                        (USER_KEY.to_string(), None),
                    ]
            })
            .returning(|_| Ok(()));

        SessionStore::new(Arc::new(mock)).clear().unwrap();
    }

    #[test]
    fn read_errors_are_treated_as_missing() {
        let mut mock = MockSessionStorage::new();
        mock.expect_get()
            .returning(|_| Err(ClientError::Storage("disk gone".into())));
        let store = SessionStore::new(Arc::new(mock));
        assert!(store.access_token().is_none());
        assert!(store.snapshot().is_empty());
    }
}
