use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::io::atomic_write;
use crate::model::session::{Session, User};

/// Storage key for the user JSON blob
pub const USER_KEY: &str = "user";
/// Storage key for the raw auth token
pub const TOKEN_KEY: &str = "token";

/// Error type for local storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Device-local string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Apply several writes together; `None` removes the key. Stores that
    /// can commit them in one step should override this.
    fn set_many(&mut self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// In-memory store, for tests and embedders with their own persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON object file holding every key; each write replaces the file
/// atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }

    /// `storage.json` inside the workspace
    pub fn in_dir(dir: &Path) -> Self {
        FileStore::new(dir.join("storage.json"))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::ReadError {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                // Corrupted: back it up and start empty
                let bak = self.path.with_extension("json.bak");
                let _ = fs::copy(&self.path, &bak);
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "storage unreadable, backed up and reset"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        atomic_write(&self.path, content.as_bytes()).map_err(|e| StoreError::WriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    /// One read and one atomic replace for the whole batch.
    fn set_many(&mut self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        for (key, value) in entries {
            match value {
                Some(value) => map.insert(key.to_string(), value.to_string()),
                None => map.remove(*key),
            };
        }
        self.write_all(&map)
    }
}

/// Rebuild the session from storage. A user blob that no longer parses is
/// ignored (the token alone is kept).
pub fn load_session<K: KeyValueStore + ?Sized>(store: &K) -> Result<Session, StoreError> {
    let token = store.get(TOKEN_KEY)?;
    let user = match store.get(USER_KEY)? {
        Some(raw) => match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored user is unreadable; ignoring it");
                None
            }
        },
        None => None,
    };
    Ok(Session { user, token })
}

/// Persist user and token under their fixed keys, in one write.
pub fn save_session<K: KeyValueStore + ?Sized>(
    store: &mut K,
    session: &Session,
) -> Result<(), StoreError> {
    let user = session.user.as_ref().map(serde_json::to_string).transpose()?;
    store.set_many(&[
        (USER_KEY, user.as_deref()),
        (TOKEN_KEY, session.token.as_deref()),
    ])
}

/// Forget the stored user and token.
pub fn clear_session<K: KeyValueStore + ?Sized>(store: &mut K) -> Result<(), StoreError> {
    store.set_many(&[(USER_KEY, None), (TOKEN_KEY, None)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> User {
        serde_json::from_str(r#"{"_id":"u7","firstName":"Kamala","lastName":"Silva","email":"k@s.lk"}"#)
            .unwrap()
    }

    #[test]
    fn test_file_store_round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(dir.path());
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        // A second handle sees the same data
        let other = FileStore::in_dir(dir.path());
        assert_eq!(other.get("token").unwrap().as_deref(), Some("abc"));

        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_corrupt_storage_is_backed_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("storage.json"), "][").unwrap();
        let store = FileStore::in_dir(dir.path());
        assert_eq!(store.get("user").unwrap(), None);
        assert!(dir.path().join("storage.json.bak").exists());
    }

    #[test]
    fn test_session_persists_under_fixed_keys() {
        let mut store = MemoryStore::default();
        let session = Session::signed_in(user(), "tok-1".to_string());
        save_session(&mut store, &session).unwrap();

        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
        let raw_user = store.get(USER_KEY).unwrap().unwrap();
        assert!(raw_user.contains("\"firstName\":\"Kamala\""));

        assert_eq!(load_session(&store).unwrap(), session);

        clear_session(&mut store).unwrap();
        assert_eq!(load_session(&store).unwrap(), Session::default());
    }

    /// Only accepts batched writes.
    #[derive(Default)]
    struct BatchOnlyStore {
        inner: MemoryStore,
        batches: usize,
    }

    impl KeyValueStore for BatchOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            panic!("unbatched write of {}", key)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            panic!("unbatched remove of {}", key)
        }

        fn set_many(&mut self, entries: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
            self.batches += 1;
            self.inner.set_many(entries)
        }
    }

    #[test]
    fn test_session_writes_user_and_token_together() {
        let mut store = BatchOnlyStore::default();
        let session = Session::signed_in(user(), "tok-2".to_string());
        save_session(&mut store, &session).unwrap();
        assert_eq!(store.batches, 1);
        assert_eq!(load_session(&store).unwrap(), session);

        clear_session(&mut store).unwrap();
        assert_eq!(store.batches, 2);
        assert_eq!(load_session(&store).unwrap(), Session::default());
    }

    #[test]
    fn test_file_store_batch_replaces_both_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(dir.path());
        store.set_many(&[(USER_KEY, Some("old-user")), (TOKEN_KEY, Some("old"))]).unwrap();
        store.set_many(&[(USER_KEY, Some("new-user")), (TOKEN_KEY, None)]).unwrap();

        let raw = fs::read_to_string(dir.path().join("storage.json")).unwrap();
        let map: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[USER_KEY], "new-user");
    }

    #[test]
    fn test_unreadable_user_keeps_token() {
        let mut store = MemoryStore::default();
        store.set(USER_KEY, "not json").unwrap();
        store.set(TOKEN_KEY, "t").unwrap();
        let session = load_session(&store).unwrap();
        assert!(session.user.is_none());
        assert_eq!(session.token.as_deref(), Some("t"));
    }
}
