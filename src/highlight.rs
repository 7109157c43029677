//! Persisted highlight state for tracking-line editing.
//!
//! After editing delivery-note tracking lines, the UI highlights which
//! lines were edited and which were newly added until the user clears
//! them. That state is cosmetic, keyed by tracking id, and must survive
//! restarts — the browser original kept it under a fixed local-storage
//! key. Here it sits behind a small keyed storage trait so the backend
//! (memory for tests, a JSON file on disk for the CLI) is swappable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HermodError, Result};

/// Line ids to highlight for one tracking document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSet {
    #[serde(default)]
    pub edited: Vec<i64>,
    #[serde(default)]
    pub added: Vec<i64>,
}

impl HighlightSet {
    pub fn is_empty(&self) -> bool {
        self.edited.is_empty() && self.added.is_empty()
    }
}

/// Keyed persistence for highlight sets.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Highlights for one tracking id; empty set when none stored.
    async fn get(&self, tracking_id: i64) -> Result<HighlightSet>;

    /// Replace the highlights for one tracking id. An empty set removes
    /// the record.
    async fn set(&self, tracking_id: i64, highlights: HighlightSet) -> Result<()>;

    /// Drop the highlights for one tracking id.
    async fn clear(&self, tracking_id: i64) -> Result<()> {
        self.set(tracking_id, HighlightSet::default()).await
    }
}

/// Process-local store, used in tests and headless embedding.
#[derive(Default)]
pub struct MemoryHighlightStore {
    sets: Mutex<HashMap<i64, HighlightSet>>,
}

impl MemoryHighlightStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HighlightStore for MemoryHighlightStore {
    async fn get(&self, tracking_id: i64) -> Result<HighlightSet> {
        Ok(self
            .sets
            .lock()
            .expect("highlight lock")
            .get(&tracking_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set(&self, tracking_id: i64, highlights: HighlightSet) -> Result<()> {
        let mut sets = self.sets.lock().expect("highlight lock");
        if highlights.is_empty() {
            sets.remove(&tracking_id);
        } else {
            sets.insert(tracking_id, highlights);
        }
        Ok(())
    }
}

/// One JSON file holding every tracking id's highlights, written
/// atomically (tmp + rename). A missing or corrupt file reads as empty.
pub struct JsonFileHighlightStore {
    path: PathBuf,
}

impl JsonFileHighlightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `~/.cache/hermod/highlights.json`.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("hermod")
            .join("highlights.json")
    }

    fn load(&self) -> HashMap<i64, HighlightSet> {
        load_sets(&self.path).unwrap_or_default()
    }

    fn save(&self, sets: &HashMap<i64, HighlightSet>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HermodError::Configuration(format!(
                    "failed to create highlight dir {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(sets)?;
        std::fs::write(&tmp_path, &json).map_err(|e| {
            HermodError::Configuration(format!(
                "failed to write highlight file {}: {e}",
                tmp_path.display()
            ))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            HermodError::Configuration(format!(
                "failed to rename highlight file {} → {}: {e}",
                tmp_path.display(),
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

fn load_sets(path: &Path) -> Option<HashMap<i64, HighlightSet>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read highlight file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(sets) => Some(sets),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt highlight file");
            None
        }
    }
}

#[async_trait]
impl HighlightStore for JsonFileHighlightStore {
    async fn get(&self, tracking_id: i64) -> Result<HighlightSet> {
        Ok(self.load().get(&tracking_id).cloned().unwrap_or_default())
    }

    async fn set(&self, tracking_id: i64, highlights: HighlightSet) -> Result<()> {
        let mut sets = self.load();
        if highlights.is_empty() {
            sets.remove(&tracking_id);
        } else {
            sets.insert(tracking_id, highlights);
        }
        self.save(&sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryHighlightStore::new();
        let set = HighlightSet {
            edited: vec![1, 2],
            added: vec![3],
        };
        store.set(7, set.clone()).await.unwrap();
        assert_eq!(store.get(7).await.unwrap(), set);
        assert!(store.get(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_clear_removes() {
        let store = MemoryHighlightStore::new();
        store
            .set(7, HighlightSet { edited: vec![1], added: vec![] })
            .await
            .unwrap();
        store.clear(7).await.unwrap();
        assert!(store.get(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHighlightStore::new(dir.path().join("highlights.json"));
        let set = HighlightSet {
            edited: vec![10],
            added: vec![11, 12],
        };
        store.set(42, set.clone()).await.unwrap();
        assert_eq!(store.get(42).await.unwrap(), set);
    }

    #[tokio::test]
    async fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHighlightStore::new(dir.path().join("nope.json"));
        assert!(store.get(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highlights.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileHighlightStore::new(&path);
        assert!(store.get(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("h.json");
        let store = JsonFileHighlightStore::new(&path);
        store
            .set(1, HighlightSet { edited: vec![1], added: vec![] })
            .await
            .unwrap();
        assert!(path.exists());
    }
}
