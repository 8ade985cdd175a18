//! Reading progress — durable key-value storage and the per-story marker.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::scene::SceneId;

/// Prefix of the key every story's progress marker lives under.
pub const PROGRESS_KEY_PREFIX: &str = "visual-progress-";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// String key-value storage scoped to one user, the way browser local
/// storage is.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Volatile store, lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
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

/// Store backed by a single JSON object file. A missing file reads as an
/// empty store; every write rewrites the whole file, replacing a corrupt one.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current entries for a write. A corrupt file is dropped so the store
    /// stays writable; reads still report it.
    fn read_for_write(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_all() {
            Err(StoreError::Json(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt store file, overwriting"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_for_write()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Storage key for a story's progress marker.
pub fn progress_key(story: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{story}")
}

/// Saves, restores and clears the "last scene" marker per story.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker<S> {
    store: S,
}

impl<S: KeyValueStore> ProgressTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The saved scene for `story`, or the start scene when nothing usable
    /// is stored. Never fails: a corrupt marker or an unreadable store both
    /// mean "start from the beginning".
    pub fn load(&self, story: &str) -> SceneId {
        let key = progress_key(story);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SceneId::START,
            Err(e) => {
                tracing::warn!(%story, error = %e, "could not read progress, starting over");
                return SceneId::START;
            }
        };
        match raw.trim().parse::<u32>() {
            Ok(id) => SceneId(id),
            Err(_) => {
                tracing::warn!(%story, marker = %raw, "corrupt progress marker, starting over");
                SceneId::START
            }
        }
    }

    /// Overwrite the marker for `story`.
    pub fn save(&mut self, story: &str, scene: SceneId) -> Result<(), StoreError> {
        self.store.set(&progress_key(story), &scene.0.to_string())?;
        tracing::info!(%story, %scene, "progress saved");
        Ok(())
    }

    /// Forget the marker for `story`.
    pub fn reset(&mut self, story: &str) -> Result<(), StoreError> {
        self.store.remove(&progress_key(story))?;
        tracing::info!(%story, "progress reset");
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
