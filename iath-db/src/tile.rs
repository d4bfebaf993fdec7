//! Knowledge tile data model.
//!
//! A tile is one self-contained unit of verified reasoning text plus its
//! position in a domain coordinate space. The JSON shape produced by serde
//! here is what upstream tile producers hand to the batch encoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in a 3-axis space (domain space or meta space).
pub type Point3 = [f32; 3];

/// A complete knowledge tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub metadata: TileMetadata,
    pub content: TileContent,
    pub coordinates: TileCoordinates,
    pub verification: Verification,

    /// Provenance info. Never persisted in `.iath` files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,

    /// Edit history. Never persisted in `.iath` files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<serde_json::Value>,
}

impl Tile {
    /// Tile id (unique within a database file).
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Representative domain-space coordinate.
    pub fn domain_space(&self) -> Point3 {
        self.coordinates.domain_space
    }

    /// Certainty as stored on the first meta axis.
    pub fn certainty(&self) -> f32 {
        self.coordinates.meta_space[0]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMetadata {
    #[serde(alias = "knowledge_id")]
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileContent {
    pub thinking_process: String,
    pub final_response: String,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileCoordinates {
    #[serde(alias = "medical_space")]
    pub domain_space: Point3,
    /// `[certainty 0-100, granularity, verification score]`.
    pub meta_space: Point3,
    /// Per-step coordinates. Informational only; not persisted.
    #[serde(default)]
    pub reasoning_path: Vec<PathStep>,
}

/// One step of a reasoning path mapped into coordinate space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub sequence: u32,
    pub domain_space: Point3,
    pub meta_space: Point3,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub status: VerificationStatus,
    /// Initial certainty, 0-100.
    #[serde(default)]
    pub initial_certainty: u8,
    /// Reviewers. Only ids are written; decode leaves this empty.
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub reviewer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Verification state of a tile.
///
/// Transition legality is owned by the verification pipeline; any value
/// round-trips through the codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    PendingReview,
    PartialVerified,
    Verified,
    ExpertConfirmed,
}

impl VerificationStatus {
    /// Wire code (1 byte).
    pub fn as_u8(self) -> u8 {
        match self {
            VerificationStatus::PendingReview => 0,
            VerificationStatus::PartialVerified => 1,
            VerificationStatus::Verified => 2,
            VerificationStatus::ExpertConfirmed => 3,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(VerificationStatus::PendingReview),
            1 => Some(VerificationStatus::PartialVerified),
            2 => Some(VerificationStatus::Verified),
            3 => Some(VerificationStatus::ExpertConfirmed),
            _ => None,
        }
    }
}
