//! Durable storage for half-filled multi-row forms.
//!
//! Drafts are raw JSON documents under a fixed key. Parsing is left to the
//! form that owns the draft so it can decide what a corrupt draft means.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FrontendError, Result};

pub trait DraftStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, json: &str) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}

/// One `<dir>/<key>.json` file per draft.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(FrontendError::Draft(format!("invalid draft key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        debug!(component = "drafts", key, "Loaded draft from {:?}", path);
        Ok(Some(json))
    }

    fn save(&self, key: &str, json: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            info!(component = "drafts", "Created draft directory {:?}", self.dir);
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &path)?;
        debug!(component = "drafts", key, "Saved draft to {:?}", path);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(component = "drafts", key, "Cleared draft");
        }
        Ok(())
    }
}

/// Process-local store, for tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    drafts: Mutex<HashMap<String, String>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.drafts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DraftStore for InMemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> Result<()> {
        self.lock().insert(key.to_string(), json.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn DraftStore) {
        assert_eq!(store.load("movimientos").unwrap(), None);
        store.save("movimientos", "[{\"fecha\":\"2024-03-01\"}]").unwrap();
        assert_eq!(
            store.load("movimientos").unwrap().as_deref(),
            Some("[{\"fecha\":\"2024-03-01\"}]")
        );
        store.save("movimientos", "[]").unwrap();
        assert_eq!(store.load("movimientos").unwrap().as_deref(), Some("[]"));
        store.clear("movimientos").unwrap();
        store.clear("movimientos").unwrap();
        assert_eq!(store.load("movimientos").unwrap(), None);
    }

    #[test]
    fn test_in_memory_store() {
        exercise(&InMemoryDraftStore::new());
    }

    #[test]
    fn test_file_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileDraftStore::new(temp_dir.path().join("drafts"));
        exercise(&store);

        store.save("movimientos_labels", "{}").unwrap();
        assert!(store.dir().join("movimientos_labels.json").exists());
        assert!(!store.dir().join("movimientos_labels.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileDraftStore::new(temp_dir.path());
        assert!(matches!(
            store.save("../fuera", "{}"),
            Err(FrontendError::Draft(_))
        ));
        assert!(store.load("").is_err());
    }
}
