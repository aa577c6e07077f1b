//! Snapshot persistence — a key-value collaborator keyed by logical entity name.
//!
//! The console saves whole-entity JSON snapshots ("orders", "contacts", ...)
//! after mutations and restores them at startup. No partial updates, no
//! cross-process locking; the file backend writes a temp file and renames it
//! so a crash mid-save leaves the previous snapshot intact.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistError;

/// Key-value persistence boundary.
pub trait Persistence: Send + Sync {
    /// Load the JSON snapshot stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Store `json` under `key`, replacing any previous snapshot.
    fn save(&self, key: &str, json: &str) -> Result<(), PersistError>;
}

/// Serialize `value` and store it under `key`.
pub fn save_entity<T: Serialize>(
    store: &dyn Persistence,
    key: &str,
    value: &T,
) -> Result<(), PersistError> {
    let json = serde_json::to_string(value)?;
    store.save(key, &json)
}

/// Load and deserialize the snapshot under `key`, if present.
pub fn load_entity<T: DeserializeOwned>(
    store: &dyn Persistence,
    key: &str,
) -> Result<Option<T>, PersistError> {
    match store.load(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// File-backed persistence: one `<key>.json` per entity under a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (or create) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), "Snapshot store opened");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Persistence for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, json: &str) -> Result<(), PersistError> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &target)?;
        tracing::debug!(key = key, bytes = json.len(), "Snapshot saved");
        Ok(())
    }
}

/// In-memory persistence for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self
            .inner
            .read()
            .expect("Memory store lock poisoned")
            .get(key)
            .cloned())
    }

    fn save(&self, key: &str, json: &str) -> Result<(), PersistError> {
        self.inner
            .write()
            .expect("Memory store lock poisoned")
            .insert(key.to_string(), json.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        let value = Sample {
            name: "orders".into(),
            count: 3,
        };

        save_entity(&store, "sample", &value).unwrap();
        let loaded: Sample = load_entity(&store, "sample").unwrap().unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn load_missing_key_is_none() {
        let store = MemoryStore::new();
        let loaded: Option<Sample> = load_entity(&store, "absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let value = Sample {
            name: "contacts".into(),
            count: 7,
        };
        save_entity(&store, "contacts", &value).unwrap();

        // Reopen to prove it hit disk.
        let reopened = FileStore::open(dir.path()).unwrap();
        let loaded: Sample = load_entity(&reopened, "contacts").unwrap().unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn file_store_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.save("orders", "{\"v\":1}").unwrap();
        store.save("orders", "{\"v\":2}").unwrap();
        assert_eq!(store.load("orders").unwrap().unwrap(), "{\"v\":2}");
    }

    #[test]
    fn corrupt_snapshot_is_an_error_not_a_panic() {
        let store = MemoryStore::new();
        store.save("sample", "not json").unwrap();
        let loaded: Result<Option<Sample>, _> = load_entity(&store, "sample");
        assert!(loaded.is_err());
    }
}
