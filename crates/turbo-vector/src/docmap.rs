//! Local ↔ global document id mapping for one shard.
//!
//! Built incrementally by the shard writer (global → local), persisted once
//! at shutdown as a JSON object keyed by local id, and loaded read-only by
//! the shard node, which resolves lexical hits (global ids) to vector slots.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use turbo_core::error::{Error, Result};
use turbo_core::types::{GlobalDocId, LocalDocId};

#[derive(Debug, Default, Clone)]
pub struct DocMap {
    by_global: HashMap<GlobalDocId, LocalDocId>,
}

impl DocMap {
    pub fn new() -> Self { Self::default() }

    /// Record `global → local`. Returns `false` and leaves the map untouched
    /// when the global id is already present.
    pub fn insert(&mut self, global: GlobalDocId, local: LocalDocId) -> bool {
        match self.by_global.entry(global) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(local);
                true
            }
        }
    }

    pub fn contains(&self, global: &str) -> bool { self.by_global.contains_key(global) }

    pub fn local_id(&self, global: &str) -> Option<LocalDocId> { self.by_global.get(global).copied() }

    pub fn len(&self) -> usize { self.by_global.len() }

    pub fn is_empty(&self) -> bool { self.by_global.is_empty() }

    /// Local id → global id, ordered by local id.
    pub fn inverted(&self) -> BTreeMap<LocalDocId, GlobalDocId> {
        self.by_global.iter().map(|(g, l)| (*l, g.clone())).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.inverted())
            .map_err(|e| Error::DocMap(format!("encode {}: {e}", path.display())))?;
        std::fs::write(path, data)?;
        tracing::debug!(path = %path.display(), entries = self.len(), "docmap saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let by_local: BTreeMap<LocalDocId, GlobalDocId> = serde_json::from_slice(&data)
            .map_err(|e| Error::DocMap(format!("decode {}: {e}", path.display())))?;
        let mut map = Self::new();
        for (local, global) in by_local {
            if !map.insert(global.clone(), local) {
                return Err(Error::DocMap(format!("global id {global:?} mapped to more than one local id")));
            }
        }
        Ok(map)
    }
}
