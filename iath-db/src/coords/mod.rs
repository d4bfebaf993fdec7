//! Text → coordinate mapping driven by per-domain keyword tables.
//!
//! - [`schema`]: domain schemas and the explicitly constructed registry
//! - [`space`]: keyword scanning and reasoning-path mapping
//! - [`meta`]: certainty, granularity, and verification-score axes

pub mod meta;
pub mod schema;
pub mod space;

pub use meta::{certainty, certainty_score, granularity, verification_score, CertaintyInputs};
pub use schema::{Axis, AxisDef, DomainRegistry, DomainSchema, KeywordMapping, DEFAULT_MIDPOINT};
pub use space::{CoordinateSpace, ExtractedPoint, ReasoningStep};
