//! Error types for tile database operations.

use std::io;
use thiserror::Error;

/// Tile database errors.
///
/// Header and index corruption (`CorruptFile`) is fatal for a load. A single
/// malformed tile blob (`CorruptTile`) is recoverable: batch decode logs and
/// skips it.
#[derive(Error, Debug)]
pub enum TileDbError {
    /// File missing or unreadable.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bad magic, unparsable header, or unparsable index.
    #[error("corrupt database file: {0}")]
    CorruptFile(String),

    /// Malformed single-tile blob.
    #[error("corrupt tile{}: {reason}", .id.as_deref().map(|id| format!(" '{id}'")).unwrap_or_default())]
    CorruptTile { id: Option<String>, reason: String },

    /// Non-finite coordinate or otherwise unencodable value.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid or unknown domain schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TileDbError {
    pub(crate) fn corrupt_tile(reason: impl Into<String>) -> Self {
        TileDbError::CorruptTile {
            id: None,
            reason: reason.into(),
        }
    }

    /// Attach the index id to a tile-level error that was raised without one.
    pub(crate) fn with_tile_id(self, tile_id: &str) -> Self {
        match self {
            TileDbError::CorruptTile { id: None, reason } => TileDbError::CorruptTile {
                id: Some(tile_id.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// Whether a batch load may skip past this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TileDbError::CorruptTile { .. })
    }
}

/// Result type for tile database operations.
pub type Result<T> = std::result::Result<T, TileDbError>;
