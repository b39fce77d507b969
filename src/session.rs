use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use rand::Rng;

/// Key the session id is stored under.
pub const SESSION_KEY: &str = "sessionId";

const ID_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 13;

/// Minimal persistent key/value storage. Abstracted so the session logic can
/// be tested against an in-memory store.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Key/value store backed by a JSON file under the user's config directory.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Deletes the default store file so the next run mints a fresh session.
    pub fn reset_default() -> Result<()> {
        match fs::remove_file(Self::default_path()?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        Ok(config_dir.join("doppel").join("session.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_CHARS[rng.gen_range(0..ID_CHARS.len())] as char)
        .collect()
}

/// Returns the stored session id, minting and persisting a new one if the
/// store has none. An empty stored value counts as missing.
pub fn get_or_create(store: &mut dyn KvStore) -> Result<String> {
    if let Some(id) = store.get(SESSION_KEY) {
        if !id.is_empty() {
            return Ok(id);
        }
    }
    let id = generate_id();
    store.set(SESSION_KEY, &id)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        entries: BTreeMap<String, String>,
        writes: usize,
    }

    impl KvStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.get(key).cloned()
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.writes += 1;
            self.entries.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn id_is_stable_across_calls() {
        let mut store = MemoryStore::default();
        let first = get_or_create(&mut store).unwrap();
        let second = get_or_create(&mut store).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn id_is_thirteen_base36_characters() {
        let mut store = MemoryStore::default();
        let id = get_or_create(&mut store).unwrap();
        assert_eq!(id.chars().count(), 13);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn empty_stored_value_is_replaced() {
        let mut store = MemoryStore::default();
        store.set(SESSION_KEY, "").unwrap();
        let id = get_or_create(&mut store).unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.get(SESSION_KEY).unwrap(), id);
    }

    #[test]
    fn writes_exactly_once() {
        let mut store = MemoryStore::default();
        get_or_create(&mut store).unwrap();
        get_or_create(&mut store).unwrap();
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let id = {
            let mut store = FileStore::open(path.clone()).unwrap();
            get_or_create(&mut store).unwrap()
        };

        let mut store = FileStore::open(path).unwrap();
        assert_eq!(get_or_create(&mut store).unwrap(), id);
    }

    #[test]
    fn file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("session.json");

        let mut store = FileStore::open(path.clone()).unwrap();
        get_or_create(&mut store).unwrap();

        assert!(path.exists());
    }
}
