//! Checksum → asset id index used to flag likely duplicate uploads.
//!
//! The index is a cache derived from the `assets` table and can be rebuilt
//! from it at any time (see [`AssetStore::rebuild_dedup_index`]). It never
//! blocks ingestion. While it is in the unknown state (after a failed
//! rebuild) every lookup returns `None` and writes are dropped until the next
//! successful rebuild replaces the contents.
//!
//! [`AssetStore::rebuild_dedup_index`]: super::asset_store::AssetStore::rebuild_dedup_index

use std::{
    collections::{BTreeSet, HashMap},
    sync::{PoisonError, RwLock},
};
use uuid::Uuid;

type Entries = HashMap<String, BTreeSet<Uuid>>;

#[derive(Debug, Default)]
pub struct DedupIndex {
    entries: RwLock<Option<Entries>>,
}

impl DedupIndex {
    /// An empty, available index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
        }
    }

    /// An index that has not been built yet.
    pub fn unknown() -> Self {
        Self {
            entries: RwLock::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// All asset ids sharing `checksum`, ascending.
    pub fn index_of(&self, checksum: &str) -> Option<Vec<Uuid>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.as_ref()?;
        Some(
            entries
                .get(checksum)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
        )
    }

    /// Number of *other* assets sharing `checksum` with `id`.
    pub fn duplicate_count(&self, id: Uuid, checksum: &str) -> Option<usize> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entries = guard.as_ref()?;
        Some(
            entries
                .get(checksum)
                .map(|ids| ids.iter().filter(|other| **other != id).count())
                .unwrap_or(0),
        )
    }

    pub fn insert(&self, checksum: &str, id: Uuid) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = guard.as_mut() {
            entries.entry(checksum.to_string()).or_default().insert(id);
        }
    }

    /// Drop `id` from `checksum`, removing the mapping once no asset shares it.
    pub fn remove(&self, checksum: &str, id: Uuid) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = guard.as_mut() {
            if let Some(ids) = entries.get_mut(checksum) {
                ids.remove(&id);
                if ids.is_empty() {
                    entries.remove(checksum);
                }
            }
        }
    }

    /// Replace the whole index with freshly scanned `(id, checksum)` pairs.
    pub fn replace_all(&self, pairs: impl IntoIterator<Item = (Uuid, String)>) -> usize {
        let mut rebuilt: Entries = HashMap::new();
        for (id, checksum) in pairs {
            rebuilt.entry(checksum).or_default().insert(id);
        }
        let checksums = rebuilt.len();
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Some(rebuilt);
        checksums
    }

    /// Mark the index unknown; annotations disappear until a rebuild.
    pub fn invalidate(&self) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
