//! Key-value persistence for credential material.
//!
//! [`SecretStore`] is the narrow `get`/`set`/`remove` interface the
//! credential layer writes through. The file-backed store keeps a single
//! JSON object in the user's data directory, private to this application.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Durable string storage scoped to this application.
///
/// Writes are last-writer-wins.
pub trait SecretStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> ProviderResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> ProviderResult<()>;

    /// Deletes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ProviderResult<()>;
}

/// A [`SecretStore`] backed by a JSON file.
///
/// Every write replaces the file through a temporary file and a rename, so a
/// concurrent reader sees either the old or the new content. On Unix the file
/// is restricted to the owner.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Default location: `<data_dir>/timeblock/credentials.json`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("timeblock")
            .join("credentials.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> ProviderResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::storage(format!("failed to read {}: {}", self.path.display(), e))
                .with_source(e)
        })?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            ProviderError::storage(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(map)
            .map_err(|e| ProviderError::internal(format!("failed to serialize store: {}", e)))?;

        let temp_path = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            ProviderError::storage(format!("failed to write {}: {}", temp_path.display(), e))
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!("wrote credential store {:?}", self.path);
        Ok(())
    }

    fn lock(&self) -> ProviderResult<std::sync::MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|e| ProviderError::internal(format!("store lock poisoned: {}", e)))
    }
}

/// Writes `content` to a fresh file that only the owner can read.
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    // The mode only applies on creation.
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        let _guard = self.lock()?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ProviderResult<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> ProviderResult<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::storage(format!("failed to remove {}: {}", self.path.display(), e))
            })?;
            return Ok(());
        }
        self.write_map(&map)
    }
}

/// An in-process [`SecretStore`], mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> ProviderResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| ProviderError::internal(format!("in-memory store lock poisoned: {}", e)))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ProviderResult<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ProviderResult<()> {
        self.values()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileSecretStore::new(&path);

        assert_eq!(store.get("access_token").unwrap(), None);
        store.set("access_token", "abc").unwrap();
        store.set("refresh_token", "def").unwrap();
        assert!(path.exists());

        let reopened = FileSecretStore::new(&path);
        assert_eq!(reopened.get("access_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("refresh_token").unwrap().as_deref(), Some("def"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileSecretStore::new(&path);
        store.set("google_credential", "{}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // A leftover temp file with open permissions is not reused as is.
        let temp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&temp, "stale").unwrap();
        fs::set_permissions(&temp, fs::Permissions::from_mode(0o644)).unwrap();
        store.set("google_credential", "{\"a\":1}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!temp.exists());
    }

    #[test]
    fn file_store_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let first = FileSecretStore::new(&path);
        let second = FileSecretStore::new(&path);

        first.set("access_token", "old").unwrap();
        second.set("access_token", "new").unwrap();
        assert_eq!(first.get("access_token").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn file_store_remove_deletes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileSecretStore::new(&path);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();
        assert!(path.exists());
        assert_eq!(store.get("a").unwrap(), None);

        store.remove("b").unwrap();
        assert!(!path.exists());
        store.remove("missing").unwrap();
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();
        let err = FileSecretStore::new(&path).get("a").unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::StorageError);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        FileSecretStore::new(&path).set("a", "1").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_behaves_like_a_map() {
        let store = MemorySecretStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
