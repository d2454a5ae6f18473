use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use terrace_map::CutCoord;

use crate::chunk::ChunkMeshes;

#[derive(Clone, Copy, Debug, Default)]
pub struct CutCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because their cut was unloaded or rebuilt at a newer revision.
    pub removals: u64,
    pub entries: usize,
}

/// Committed cut outputs, shared read-only with render and query code.
///
/// An entry lives until its cut is unloaded or a newer revision replaces it;
/// there is no capacity bound, the set of loaded cuts is the bound.
#[derive(Default)]
pub struct CutCache {
    entries: RwLock<HashMap<CutCoord, Arc<ChunkMeshes>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    removals: AtomicU64,
}

impl CutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cut's output if it was built at `expected_rev`; older output is dropped.
    pub fn get(&self, cut: CutCoord, expected_rev: u64) -> Option<Arc<ChunkMeshes>> {
        if let Some(meshes) = self.lookup(&cut) {
            if meshes.rev == expected_rev {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(meshes);
            }
            if meshes.rev < expected_rev {
                self.remove(&cut);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// The cut's latest committed output, whatever its revision.
    pub fn peek(&self, cut: CutCoord) -> Option<Arc<ChunkMeshes>> {
        let found = self.lookup(&cut);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores `meshes` unless a newer revision of the same cut is already held.
    pub fn insert(&self, meshes: Arc<ChunkMeshes>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(&meshes.cut) {
            Some(held) if held.rev > meshes.rev => {}
            _ => {
                entries.insert(meshes.cut, meshes);
            }
        }
    }

    pub fn remove(&self, cut: &CutCoord) -> bool {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.remove(cut)
        };
        if removed.is_some() {
            self.removals.fetch_add(1, Ordering::Relaxed);
        }
        removed.is_some()
    }

    pub fn stats(&self) -> CutCacheStats {
        CutCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            entries: self.entries.read().map(|m| m.len()).unwrap_or(0),
        }
    }

    fn lookup(&self, cut: &CutCoord) -> Option<Arc<ChunkMeshes>> {
        self.entries
            .read()
            .ok()
            .and_then(|map| map.get(cut).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::build_chunk;
    use terrace_map::{GridCoord, HeightGrid, MeshConfig, TileKind, WorldSeed};

    fn config() -> MeshConfig {
        MeshConfig::from_toml_str("[grid]\ncut_size = 1\n[flow]\nmargin = 0\n[bottom]\nmargin = 0").unwrap()
    }

    fn meshes(g: &HeightGrid, cfg: &MeshConfig, cut: CutCoord, rev: u64) -> Arc<ChunkMeshes> {
        Arc::new(build_chunk(g, cut, rev, cfg, &WorldSeed(1)).unwrap().0)
    }

    #[test]
    fn stale_revision_misses_and_is_removed() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 0, TileKind::Plain);
        let cfg = config();
        let cache = CutCache::new();
        let cut = CutCoord::new(0, 0);
        cache.insert(meshes(&g, &cfg, cut, 1));
        assert!(cache.get(cut, 1).is_some());
        assert!(cache.get(cut, 2).is_none());
        assert!(cache.peek(cut).is_none());
        let s = cache.stats();
        assert_eq!((s.hits, s.removals, s.entries), (1, 1, 0));
    }

    #[test]
    fn late_older_revision_does_not_replace_newer() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 4, 4, 0, TileKind::Plain);
        let cfg = config();
        let cache = CutCache::new();
        let cut = CutCoord::new(1, 1);
        cache.insert(meshes(&g, &cfg, cut, 3));
        cache.insert(meshes(&g, &cfg, cut, 2));
        assert_eq!(cache.peek(cut).map(|m| m.rev), Some(3));
        assert!(cache.get(cut, 2).is_none());
        assert!(cache.get(cut, 3).is_some());
    }

    #[test]
    fn many_cuts_stay_resident() {
        let g = HeightGrid::filled(GridCoord::new(0, 0), 40, 40, 0, TileKind::Plain);
        let cfg = config();
        let cache = CutCache::new();
        for cy in 0..40 {
            for cx in 0..40 {
                cache.insert(meshes(&g, &cfg, CutCoord::new(cx, cy), 0));
            }
        }
        assert_eq!(cache.stats().entries, 1600);
        assert!(cache.get(CutCoord::new(0, 0), 0).is_some());
        assert_eq!(cache.stats().removals, 0);
    }
}
