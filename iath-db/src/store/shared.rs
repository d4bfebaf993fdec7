//! Swappable shared handle to the current tile store.

use super::{LoadReport, TileStore};
use crate::error::{Result, TileDbError};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Holds the live [`TileStore`] behind an `Arc` that readers clone.
///
/// A reload builds a complete new store first and then swaps the pointer,
/// so readers holding the previous `Arc` keep a consistent view and a failed
/// reload leaves the current store in place.
#[derive(Debug)]
pub struct SharedTileStore {
    current: RwLock<Arc<TileStore>>,
}

impl SharedTileStore {
    pub fn new(store: TileStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The store currently being served.
    pub fn current(&self) -> Arc<TileStore> {
        self.current.read().clone()
    }

    /// Install `store`, returning the one it replaced.
    pub fn replace(&self, store: TileStore) -> Arc<TileStore> {
        std::mem::replace(&mut *self.current.write(), Arc::new(store))
    }

    /// Rebuild from `path` (or the current store's path) with the current
    /// store's configuration and swap it in.
    pub fn reload(&self, path: Option<&Path>) -> Result<LoadReport> {
        let current = self.current();
        let path = match path.or_else(|| current.path()) {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(TileDbError::Config(
                    "reload needs a path: current store was not loaded from a file".into(),
                ))
            }
        };

        let fresh = TileStore::load(&path, current.config().clone())?;
        let report = fresh.load_report().clone();
        self.replace(fresh);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::format::{encode_batch, write_database};
    use crate::tile::{Tile, TileContent, TileCoordinates, TileMetadata, Verification};
    use chrono::Utc;

    fn tile(id: &str) -> Tile {
        Tile {
            metadata: TileMetadata {
                id: id.into(),
                topic: id.into(),
                domain: String::new(),
                created_at: Utc::now(),
                version: 1,
            },
            content: TileContent::default(),
            coordinates: TileCoordinates::default(),
            verification: Verification::default(),
            source: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_reload_swaps_without_disturbing_readers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.iath");
        write_database(&path, &[tile("v1")], 1).unwrap();

        let shared = SharedTileStore::new(TileStore::load(&path, StoreConfig::default()).unwrap());
        let before = shared.current();
        assert!(before.get("v1").is_some());

        write_database(&path, &[tile("v2a"), tile("v2b")], 1).unwrap();
        let report = shared.reload(None).unwrap();
        assert_eq!(report.loaded, 2);

        // The old handle is untouched; new readers see the new store.
        assert!(before.get("v1").is_some());
        assert!(shared.current().get("v2b").is_some());
        assert!(shared.current().get("v1").is_none());
    }

    #[test]
    fn test_failed_reload_keeps_current_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.iath");
        write_database(&path, &[tile("keep")], 1).unwrap();
        let shared = SharedTileStore::new(TileStore::load(&path, StoreConfig::default()).unwrap());

        std::fs::write(&path, b"garbage").unwrap();
        assert!(shared.reload(None).is_err());
        assert!(shared.current().get("keep").is_some());
    }

    #[test]
    fn test_reload_without_path() {
        let bytes = encode_batch(&[tile("mem")], 1).unwrap();
        let shared =
            SharedTileStore::new(TileStore::from_bytes(&bytes, StoreConfig::default()).unwrap());
        assert!(matches!(
            shared.reload(None).unwrap_err(),
            TileDbError::Config(_)
        ));
    }
}
