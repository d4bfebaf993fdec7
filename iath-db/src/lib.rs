//! Persistence core for coordinate-addressed knowledge tiles.
//!
//! Tiles are reasoning records placed in a 3-axis domain space (0..=100 per
//! axis) plus a meta space of certainty, granularity and verification. They
//! are packed into `.iath` database files and served from memory.
//!
//! ```text
//! ┌──────────────┬───────────────────────┬──────────────────────────────┐
//! │ header (64B) │ JSON index            │ zstd tile blobs              │
//! │ "ILMA" ...   │ [{id, offset, length}]│ offsets relative to data     │
//! └──────────────┴───────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`format`]: `.iath` header, per-tile binary codec, whole-file encode/decode
//! - [`coords`]: domain schemas and keyword-driven coordinate extraction
//! - [`store`]: load a database and answer fetch/search/stats queries
//! - [`hot_cache`]: bounded LRU cache for repeated lookups
//! - [`config`]: store and cache configuration
//! - [`tile`]: the tile data model
//! - [`error`]: error types

pub mod config;
pub mod coords;
pub mod error;
pub mod format;
pub mod hot_cache;
pub mod store;
pub mod tile;

// Re-export key types
pub use config::{CacheConfig, CollisionPolicy, MatchStrategy, StoreConfig};
pub use coords::{CoordinateSpace, DomainRegistry, DomainSchema, ExtractedPoint, ReasoningStep};
pub use error::{Result, TileDbError};
pub use format::{decode_batch, decode_tile, encode_batch, encode_tile, write_database};
pub use hot_cache::{CachedTileLookup, HotCache};
pub use store::{CoordKey, LoadReport, SharedTileStore, StoreStats, TileStore};
pub use tile::{
    PathStep, Point3, Reviewer, Tile, TileContent, TileCoordinates, TileMetadata, Verification,
    VerificationStatus,
};
