//! Keyword-driven coordinate extraction.
//!
//! Matching is plain substring containment against the schema's keyword
//! table. For the whole-text point each axis takes the *first* matching
//! keyword in table order; this is a stable tie-break, not a relevance
//! ranking.

use super::meta::{certainty, granularity, verification_score};
use super::schema::{Axis, DomainSchema, KeywordMapping};
use crate::error::Result;
use crate::tile::{PathStep, Point3, TileCoordinates};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Confidence reported when no keyword matched.
const NO_MATCH_CONFIDENCE: f32 = 0.5;
/// Confidence reported when at least one keyword matched.
const MATCH_CONFIDENCE: f32 = 0.75;

/// Result of [`CoordinateSpace::extract_point`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedPoint {
    pub coordinate: Point3,
    /// Every keyword found in the text, in table order.
    pub matched_keywords: Vec<String>,
    pub confidence: f32,
}

/// One reasoning step handed in by the upstream extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub sequence: u32,
    pub text: String,
    /// Step confidence, 0.0-1.0.
    pub confidence: f32,
    #[serde(default)]
    pub concepts: Vec<String>,
}

/// Coordinate mapper bound to one domain schema.
#[derive(Debug, Clone)]
pub struct CoordinateSpace {
    schema: Arc<DomainSchema>,
}

impl CoordinateSpace {
    /// Bind to `schema`, which must pass [`DomainSchema::validate`].
    pub fn new(schema: Arc<DomainSchema>) -> Result<Self> {
        schema.validate()?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &DomainSchema {
        &self.schema
    }

    /// Map free text to a single domain-space point.
    ///
    /// Always returns a point; axes without a matching keyword sit at the
    /// schema midpoint.
    pub fn extract_point(&self, text: &str) -> ExtractedPoint {
        let mut coordinate = self.schema.midpoint;
        let mut resolved = [false; 3];
        let mut matched_keywords = Vec::new();

        for kw in self.matches(text) {
            let i = kw.axis.index();
            if !resolved[i] {
                coordinate[i] = kw.coord;
                resolved[i] = true;
            }
            matched_keywords.push(kw.keyword.clone());
        }

        let confidence = if matched_keywords.is_empty() {
            NO_MATCH_CONFIDENCE
        } else {
            MATCH_CONFIDENCE
        };

        ExtractedPoint {
            coordinate,
            matched_keywords,
            confidence,
        }
    }

    /// Map each reasoning step to a point.
    ///
    /// Every step starts from the whole-text point (all step texts joined)
    /// and then applies the keywords found in its own text, in table order,
    /// so a later keyword on the same axis overrides an earlier one.
    pub fn map_reasoning_path(&self, steps: &[ReasoningStep]) -> Vec<PathStep> {
        let full_text = steps
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let base = self.extract_point(&full_text).coordinate;

        steps
            .iter()
            .map(|step| {
                let mut domain_space = base;
                for kw in self.matches(&step.text) {
                    domain_space[kw.axis.index()] = kw.coord;
                }
                let words = step.text.split_whitespace().count();
                let meta_space = [
                    certainty(step.confidence) as f32,
                    granularity(words) as f32,
                    verification_score(step.concepts.len(), 0),
                ];
                PathStep {
                    sequence: step.sequence,
                    domain_space,
                    meta_space,
                    concepts: step.concepts.clone(),
                    confidence: step.confidence,
                }
            })
            .collect()
    }

    /// Full tile coordinates for a reasoning chain.
    ///
    /// The first step supplies the representative domain and meta points.
    /// With no steps the tile sits at the midpoint with a zero meta point.
    pub fn tile_coordinates(&self, steps: &[ReasoningStep]) -> TileCoordinates {
        let reasoning_path = self.map_reasoning_path(steps);
        let (domain_space, meta_space) = match reasoning_path.first() {
            Some(first) => (first.domain_space, first.meta_space),
            None => (self.schema.midpoint, [0.0; 3]),
        };
        TileCoordinates {
            domain_space,
            meta_space,
            reasoning_path,
        }
    }

    /// Axis value of the first keyword in table order that `text` contains.
    pub fn first_match(&self, text: &str, axis: Axis) -> Option<f32> {
        self.matches(text)
            .find(|kw| kw.axis == axis)
            .map(|kw| kw.coord)
    }

    fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a KeywordMapping> + 'a {
        self.schema
            .keywords
            .iter()
            .filter(move |kw| text.contains(kw.keyword.as_str()))
    }
}
