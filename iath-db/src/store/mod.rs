//! In-memory tile store.
//!
//! A store is built once from a whole database file and is immutable
//! afterwards: every query is a read over the loaded tiles, so a store can
//! be shared across threads behind an `Arc`. Reloading builds a new store
//! (see [`SharedTileStore`]).
//!
//! `fetch` is a linear scan over all tiles (O(N) per call). The rounded
//! coordinate index only serves exact-cell lookups via `fetch_indexed`.

mod shared;

pub use shared::SharedTileStore;

use crate::config::{CollisionPolicy, MatchStrategy, StoreConfig};
use crate::error::Result;
use crate::format::{decode_batch, DatabaseHeader, SkippedTile};
use crate::tile::{Point3, Tile};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A coordinate rounded to the nearest integer on each axis.
///
/// Halves round to even, so `2.5` and `1.5` both land on `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CoordKey(pub [i64; 3]);

impl CoordKey {
    pub fn from_point(p: Point3) -> Self {
        CoordKey(p.map(|v| v.round_ties_even() as i64))
    }
}

/// Outcome of building a store from a database file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Tiles decoded and indexed.
    pub loaded: usize,
    /// Index entries whose blob could not be decoded.
    pub skipped: Vec<SkippedTile>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// True when no tile was lost during the load.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Summary statistics over the loaded tiles.
///
/// Certainty is read from each tile's first meta-space value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub tile_count: usize,
    pub avg_certainty: f32,
    pub min_certainty: f32,
    pub max_certainty: f32,
    pub file_size_bytes: u64,
}

/// Immutable, fully loaded tile database.
#[derive(Debug)]
pub struct TileStore {
    tiles: Vec<Arc<Tile>>,
    by_id: FxHashMap<String, usize>,
    coord_index: FxHashMap<CoordKey, String>,
    header: DatabaseHeader,
    file_size: u64,
    path: Option<PathBuf>,
    config: StoreConfig,
    report: LoadReport,
}

impl TileStore {
    /// Read `path` wholly into memory and build a store.
    ///
    /// I/O failures are `Io`; a bad header or index is `CorruptFile`.
    /// Corrupt tiles are skipped and listed in [`load_report`](Self::load_report).
    pub fn load(path: &Path, config: StoreConfig) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut store = Self::from_bytes(&bytes, config)?;
        store.path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            tiles = store.report.loaded,
            skipped = store.report.skipped_count(),
            "tile store loaded"
        );
        Ok(store)
    }

    /// Build a store from complete database file bytes.
    pub fn from_bytes(bytes: &[u8], config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let batch = decode_batch(bytes)?;

        let tiles: Vec<Arc<Tile>> = batch.tiles.into_iter().map(Arc::new).collect();
        let by_id = tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id().to_string(), i))
            .collect();
        let coord_index = build_coord_index(&tiles, config.collision_policy);

        let report = LoadReport {
            loaded: tiles.len(),
            skipped: batch.skipped,
        };

        Ok(Self {
            tiles,
            by_id,
            coord_index,
            header: batch.header,
            file_size: bytes.len() as u64,
            path: None,
            config,
            report,
        })
    }

    /// Find a tile within `tolerance` (Euclidean, domain space) of
    /// `coordinate` using the configured [`MatchStrategy`].
    pub fn fetch(&self, coordinate: Point3, tolerance: f32) -> Option<&Arc<Tile>> {
        self.fetch_with(coordinate, tolerance, self.config.match_strategy)
    }

    /// [`fetch`](Self::fetch) with the configured default tolerance.
    pub fn fetch_default(&self, coordinate: Point3) -> Option<&Arc<Tile>> {
        self.fetch(coordinate, self.config.default_tolerance)
    }

    /// Find a tile within `tolerance` of `coordinate` using `strategy`.
    pub fn fetch_with(
        &self,
        coordinate: Point3,
        tolerance: f32,
        strategy: MatchStrategy,
    ) -> Option<&Arc<Tile>> {
        let tolerance = tolerance as f64;
        let mut in_range = self
            .tiles
            .iter()
            .map(|t| (t, distance(coordinate, t.domain_space())))
            .filter(|(_, d)| *d <= tolerance);

        match strategy {
            MatchStrategy::FirstMatch => in_range.next().map(|(t, _)| t),
            MatchStrategy::Nearest => {
                let mut best: Option<(&Arc<Tile>, f64)> = None;
                for (t, d) in in_range {
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((t, d));
                    }
                }
                best.map(|(t, _)| t)
            }
        }
    }

    /// Exact lookup of the tile indexed at `coordinate` rounded to integers.
    pub fn fetch_indexed(&self, coordinate: Point3) -> Option<&Arc<Tile>> {
        self.coord_index
            .get(&CoordKey::from_point(coordinate))
            .and_then(|id| self.get(id))
    }

    /// Tiles whose final response contains `keyword`, ignoring case, in load
    /// order.
    pub fn search_by_keyword(&self, keyword: &str) -> Vec<&Arc<Tile>> {
        let needle = keyword.to_lowercase();
        self.tiles
            .iter()
            .filter(|t| t.content.final_response.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Tile>> {
        self.by_id.get(id).map(|&i| &self.tiles[i])
    }

    /// All tiles in load order.
    pub fn tiles(&self) -> impl ExactSizeIterator<Item = &Arc<Tile>> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// File the store was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn stats(&self) -> StoreStats {
        let certainties: Vec<f32> = self.tiles.iter().map(|t| t.certainty()).collect();
        let (avg, min, max) = if certainties.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = certainties.iter().map(|&c| c as f64).sum();
            (
                (sum / certainties.len() as f64) as f32,
                certainties.iter().copied().fold(f32::INFINITY, f32::min),
                certainties.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            )
        };
        StoreStats {
            tile_count: self.tiles.len(),
            avg_certainty: avg,
            min_certainty: min,
            max_certainty: max,
            file_size_bytes: self.file_size,
        }
    }
}

fn build_coord_index(tiles: &[Arc<Tile>], policy: CollisionPolicy) -> FxHashMap<CoordKey, String> {
    let mut index: FxHashMap<CoordKey, String> = FxHashMap::default();
    let mut collisions = 0usize;
    for tile in tiles {
        let key = CoordKey::from_point(tile.domain_space());
        match index.get_mut(&key) {
            Some(existing) => {
                collisions += 1;
                tracing::debug!(
                    cell = ?key.0,
                    existing = %existing,
                    incoming = %tile.id(),
                    "rounded coordinate collision"
                );
                if policy == CollisionPolicy::LastWriteWins {
                    *existing = tile.id().to_string();
                }
            }
            None => {
                index.insert(key, tile.id().to_string());
            }
        }
    }
    if collisions > 0 {
        tracing::debug!(collisions, policy = ?policy, "coordinate index built with collisions");
    }
    index
}

fn distance(a: Point3, b: Point3) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_batch;
    use crate::tile::{TileContent, TileCoordinates, TileMetadata, Verification};
    use chrono::Utc;

    fn tile(id: &str, xyz: Point3, certainty: f32, response: &str) -> Tile {
        Tile {
            metadata: TileMetadata {
                id: id.into(),
                topic: format!("topic {id}"),
                domain: String::new(),
                created_at: Utc::now(),
                version: 1,
            },
            content: TileContent {
                thinking_process: String::new(),
                final_response: response.into(),
                references: Vec::new(),
            },
            coordinates: TileCoordinates {
                domain_space: xyz,
                meta_space: [certainty, 100.0, 50.0],
                reasoning_path: Vec::new(),
            },
            verification: Verification::default(),
            source: None,
            history: Vec::new(),
        }
    }

    fn store(tiles: &[Tile], config: StoreConfig) -> TileStore {
        TileStore::from_bytes(&encode_batch(tiles, 1).unwrap(), config).unwrap()
    }

    #[test]
    fn test_tolerance_search() {
        let s = store(&[tile("t", [10.0; 3], 90.0, "")], StoreConfig::default());
        assert_eq!(s.fetch([12.0; 3], 5.0).unwrap().id(), "t");
        assert!(s.fetch([20.0; 3], 5.0).is_none());
    }

    #[test]
    fn test_first_match_vs_nearest() {
        let tiles = [
            tile("far", [0.0, 0.0, 0.0], 50.0, ""),
            tile("near", [3.0, 0.0, 0.0], 50.0, ""),
        ];
        let s = store(&tiles, StoreConfig::default());
        let q = [4.0, 0.0, 0.0];
        assert_eq!(s.fetch(q, 5.0).unwrap().id(), "far");
        assert_eq!(
            s.fetch_with(q, 5.0, MatchStrategy::Nearest).unwrap().id(),
            "near"
        );

        let s = store(
            &tiles,
            StoreConfig::default().with_match_strategy(MatchStrategy::Nearest),
        );
        assert_eq!(s.fetch(q, 5.0).unwrap().id(), "near");
    }

    #[test]
    fn test_nearest_tie_goes_to_earlier_tile() {
        let tiles = [
            tile("left", [-1.0, 0.0, 0.0], 50.0, ""),
            tile("right", [1.0, 0.0, 0.0], 50.0, ""),
        ];
        let s = store(&tiles, StoreConfig::default());
        let hit = s.fetch_with([0.0; 3], 2.0, MatchStrategy::Nearest).unwrap();
        assert_eq!(hit.id(), "left");
    }

    #[test]
    fn test_fetch_default_tolerance() {
        let s = store(
            &[tile("t", [0.0; 3], 50.0, "")],
            StoreConfig::default().with_default_tolerance(1.0),
        );
        assert!(s.fetch_default([0.5, 0.0, 0.0]).is_some());
        assert!(s.fetch_default([2.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_collision_policies() {
        let tiles = [
            tile("first", [10.2, 10.0, 10.0], 50.0, ""),
            tile("second", [9.8, 10.1, 9.9], 50.0, ""),
        ];
        let last = store(&tiles, StoreConfig::default());
        assert_eq!(last.fetch_indexed([10.0; 3]).unwrap().id(), "second");

        let first = store(
            &tiles,
            StoreConfig::default().with_collision_policy(CollisionPolicy::FirstWriteWins),
        );
        assert_eq!(first.fetch_indexed([10.0; 3]).unwrap().id(), "first");
        assert!(first.fetch_indexed([11.0; 3]).is_none());
    }

    #[test]
    fn test_coord_key_rounds_half_to_even() {
        assert_eq!(CoordKey::from_point([2.5, 3.5, -0.5]).0, [2, 4, 0]);
        assert_eq!(CoordKey::from_point([2.6, 3.4, -1.6]).0, [3, 3, -2]);
    }

    #[test]
    fn test_search_by_keyword_case_insensitive() {
        let tiles = [
            tile("a", [0.0; 3], 50.0, "Troponin rises after MI"),
            tile("b", [1.0; 3], 50.0, "no match here"),
            tile("c", [2.0; 3], 50.0, "TROPONIN is a marker"),
        ];
        let s = store(&tiles, StoreConfig::default());
        let ids: Vec<_> = s.search_by_keyword("troponin").iter().map(|t| t.id()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(s.search_by_keyword("absent").is_empty());
    }

    #[test]
    fn test_stats() {
        let tiles = [
            tile("a", [0.0; 3], 60.0, ""),
            tile("b", [1.0; 3], 90.0, ""),
            tile("c", [2.0; 3], 30.0, ""),
        ];
        let bytes = encode_batch(&tiles, 1).unwrap();
        let s = TileStore::from_bytes(&bytes, StoreConfig::default()).unwrap();
        let stats = s.stats();
        assert_eq!(stats.tile_count, 3);
        assert_eq!(stats.avg_certainty, 60.0);
        assert_eq!(stats.min_certainty, 30.0);
        assert_eq!(stats.max_certainty, 90.0);
        assert_eq!(stats.file_size_bytes, bytes.len() as u64);
    }

    #[test]
    fn test_empty_store_stats() {
        let s = store(&[], StoreConfig::default());
        assert!(s.is_empty());
        let stats = s.stats();
        assert_eq!(stats.tile_count, 0);
        assert_eq!(stats.avg_certainty, 0.0);
        assert!(s.fetch([0.0; 3], 1000.0).is_none());
    }

    #[test]
    fn test_get_and_iteration_order() {
        let tiles = [
            tile("z", [0.0; 3], 50.0, ""),
            tile("a", [1.0; 3], 50.0, ""),
        ];
        let s = store(&tiles, StoreConfig::default());
        assert_eq!(s.get("a").unwrap().domain_space(), [1.0; 3]);
        assert!(s.get("missing").is_none());
        let ids: Vec<_> = s.tiles().map(|t| t.id()).collect();
        assert_eq!(ids, ["z", "a"]);
        assert!(s.load_report().is_complete());
        assert_eq!(s.load_report().loaded, 2);
    }

    #[test]
    fn test_tiles_keyed_by_index_id() {
        use crate::format::{encode_tile, IndexEntry};

        let blob = encode_tile(&tile("x", [5.0; 3], 40.0, "same blob")).unwrap();
        let entries: Vec<IndexEntry> = ["a", "b"]
            .iter()
            .map(|id| IndexEntry {
                id: id.to_string(),
                offset: 0,
                length: blob.len() as u64,
            })
            .collect();
        let index = serde_json::to_vec(&entries).unwrap();
        let mut bytes = DatabaseHeader::new(1, index.len()).to_bytes().to_vec();
        bytes.extend_from_slice(&index);
        bytes.extend_from_slice(&blob);

        let s = TileStore::from_bytes(&bytes, StoreConfig::default()).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.get("a").unwrap().id(), "a");
        assert_eq!(s.get("b").unwrap().id(), "b");
        assert!(s.get("x").is_none());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = TileStore::load(Path::new("/nonexistent/db.iath"), StoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, crate::TileDbError::Io(_)));
    }
}
