//! Store and cache configuration.
//!
//! Both structs deserialize from a TOML/JSON table with every field
//! optional; missing fields take the defaults below.

use crate::error::{Result, TileDbError};
use serde::{Deserialize, Serialize};

/// How `fetch` picks among tiles within tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// First in-tolerance tile in load order.
    #[default]
    FirstMatch,
    /// Closest in-tolerance tile; ties go to the earlier tile.
    Nearest,
}

/// Which tile the rounded-coordinate index keeps on a collision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    LastWriteWins,
    FirstWriteWins,
}

/// TileStore configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub match_strategy: MatchStrategy,
    pub collision_policy: CollisionPolicy,
    /// Tolerance used when a caller does not supply one.
    pub default_tolerance: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            match_strategy: MatchStrategy::FirstMatch,
            collision_policy: CollisionPolicy::LastWriteWins,
            default_tolerance: 10.0,
        }
    }
}

impl StoreConfig {
    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_default_tolerance(mut self, tolerance: f32) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.default_tolerance.is_finite() || self.default_tolerance < 0.0 {
            return Err(TileDbError::Config(format!(
                "default_tolerance must be a finite, non-negative number (got {})",
                self.default_tolerance
            )));
        }
        Ok(())
    }
}

/// HotCache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

impl CacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TileDbError::Config("cache capacity must be positive".into()));
        }
        Ok(())
    }
}
