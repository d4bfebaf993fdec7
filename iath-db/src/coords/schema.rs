//! Domain schemas: axis definitions plus an ordered keyword → coordinate table.
//!
//! Schemas are loaded once into a [`DomainRegistry`] that callers construct
//! explicitly and share by `Arc`. The JSON document maps domain id → schema:
//!
//! ```json
//! {
//!   "medical": {
//!     "domain_name": "Medicine",
//!     "domain_code": "0x01",
//!     "axes": {
//!       "x_axis": {"name": "organ system"},
//!       "y_axis": {"name": "clinical phase"},
//!       "z_axis": {"name": "abstraction"}
//!     },
//!     "keyword_map": {
//!       "心臓": {"axis": "x", "coord": 28},
//!       "診断": {"axis": "y", "coord": 35}
//!     }
//!   }
//! }
//! ```
//!
//! Keyword order is the document order; first-match resolution depends on it,
//! so the table is never re-sorted.

use crate::error::{Result, TileDbError};
use crate::tile::Point3;
use rustc_hash::FxHashMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Midpoint used for axes with no matching keyword.
pub const DEFAULT_MIDPOINT: Point3 = [50.0, 50.0, 50.0];

/// One of the three domain-space axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of this axis in a [`Point3`].
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A keyword and the axis value it pins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMapping {
    pub keyword: String,
    pub axis: Axis,
    pub coord: f32,
}

/// A validated domain schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSchema {
    pub id: String,
    pub name: String,
    pub domain_code: u8,
    /// Axis definitions in x, y, z order.
    pub axes: [AxisDef; 3],
    pub midpoint: Point3,
    /// Keyword table in document order.
    pub keywords: Vec<KeywordMapping>,
}

impl DomainSchema {
    /// Empty schema with default axes and midpoint.
    pub fn new(id: impl Into<String>, domain_code: u8) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            domain_code,
            axes: Default::default(),
            midpoint: DEFAULT_MIDPOINT,
            keywords: Vec::new(),
        }
    }

    /// Append a keyword to the end of the table.
    pub fn with_keyword(mut self, keyword: impl Into<String>, axis: Axis, coord: f32) -> Self {
        self.keywords.push(KeywordMapping {
            keyword: keyword.into(),
            axis,
            coord,
        });
        self
    }

    pub fn with_midpoint(mut self, midpoint: Point3) -> Self {
        self.midpoint = midpoint;
        self
    }

    pub fn with_axes(mut self, axes: [AxisDef; 3]) -> Self {
        self.axes = axes;
        self
    }

    pub fn axis(&self, axis: Axis) -> &AxisDef {
        &self.axes[axis.index()]
    }

    /// Reject empty keywords and non-finite coordinates.
    ///
    /// An empty keyword would match every text.
    pub fn validate(&self) -> Result<()> {
        if let Some(m) = self.midpoint.iter().find(|v| !v.is_finite()) {
            return Err(TileDbError::Schema(format!(
                "domain '{}': non-finite midpoint value {m}",
                self.id
            )));
        }
        for kw in &self.keywords {
            if kw.keyword.is_empty() {
                return Err(TileDbError::Schema(format!(
                    "domain '{}': empty keyword",
                    self.id
                )));
            }
            if !kw.coord.is_finite() {
                return Err(TileDbError::Schema(format!(
                    "domain '{}': keyword '{}' has non-finite coord",
                    self.id, kw.keyword
                )));
            }
        }
        Ok(())
    }
}

/// All known domain schemas, in document order.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    domains: Vec<Arc<DomainSchema>>,
    by_id: FxHashMap<String, usize>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: OrderedMap<RawSchema> = serde_json::from_str(json)
            .map_err(|e| TileDbError::Schema(format!("invalid schema document: {e}")))?;

        let mut registry = Self::new();
        for (id, raw) in raw.0 {
            registry.insert(raw.into_schema(id)?)?;
        }
        tracing::debug!(domains = ?registry.list_domains(), "domain schemas loaded");
        Ok(registry)
    }

    /// Read and parse a schema document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Register a schema. Domain ids must be unique.
    pub fn insert(&mut self, schema: DomainSchema) -> Result<()> {
        schema.validate()?;
        if self.by_id.contains_key(&schema.id) {
            return Err(TileDbError::Schema(format!(
                "duplicate domain id '{}'",
                schema.id
            )));
        }
        self.by_id.insert(schema.id.clone(), self.domains.len());
        self.domains.push(Arc::new(schema));
        Ok(())
    }

    pub fn get(&self, domain_id: &str) -> Option<&Arc<DomainSchema>> {
        self.by_id.get(domain_id).map(|&i| &self.domains[i])
    }

    /// Like [`get`](Self::get) but an unknown id is a `Schema` error.
    pub fn require(&self, domain_id: &str) -> Result<&Arc<DomainSchema>> {
        self.get(domain_id).ok_or_else(|| {
            TileDbError::Schema(format!(
                "unknown domain '{}' (known: {})",
                domain_id,
                self.list_domains().join(", ")
            ))
        })
    }

    /// First schema registered with `domain_code`.
    pub fn by_code(&self, domain_code: u8) -> Option<&Arc<DomainSchema>> {
        self.domains.iter().find(|d| d.domain_code == domain_code)
    }

    /// Domain ids in document order.
    pub fn list_domains(&self) -> Vec<&str> {
        self.domains.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

// ============================================================================
// Document parsing
// ============================================================================

/// JSON object that keeps its entries in document order.
struct OrderedMap<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, V>()? {
                    entries.push((k, v));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDomainCode {
    Int(u64),
    Text(String),
}

impl RawDomainCode {
    fn parse(&self, domain_id: &str) -> Result<u8> {
        let value = match self {
            RawDomainCode::Int(n) => Some(*n),
            RawDomainCode::Text(s) => {
                let s = s.trim();
                match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16).ok(),
                    None => s.parse().ok(),
                }
            }
        };
        value.and_then(|v| u8::try_from(v).ok()).ok_or_else(|| {
            TileDbError::Schema(format!(
                "domain '{domain_id}': domain_code must be an integer 0-255"
            ))
        })
    }
}

#[derive(Deserialize, Default)]
struct RawAxes {
    #[serde(default)]
    x_axis: AxisDef,
    #[serde(default)]
    y_axis: AxisDef,
    #[serde(default)]
    z_axis: AxisDef,
}

#[derive(Deserialize)]
struct RawKeyword {
    axis: Axis,
    coord: f32,
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default, alias = "name")]
    domain_name: Option<String>,
    domain_code: RawDomainCode,
    #[serde(default)]
    axes: RawAxes,
    #[serde(default)]
    midpoint: Option<Point3>,
    #[serde(default = "empty_keywords")]
    keyword_map: OrderedMap<RawKeyword>,
}

fn empty_keywords() -> OrderedMap<RawKeyword> {
    OrderedMap(Vec::new())
}

impl RawSchema {
    fn into_schema(self, id: String) -> Result<DomainSchema> {
        let domain_code = self.domain_code.parse(&id)?;
        let keywords = self
            .keyword_map
            .0
            .into_iter()
            .map(|(keyword, raw)| KeywordMapping {
                keyword,
                axis: raw.axis,
                coord: raw.coord,
            })
            .collect();

        Ok(DomainSchema {
            name: self.domain_name.unwrap_or_else(|| id.clone()),
            id,
            domain_code,
            axes: [self.axes.x_axis, self.axes.y_axis, self.axes.z_axis],
            midpoint: self.midpoint.unwrap_or(DEFAULT_MIDPOINT),
            keywords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "medical": {
            "domain_name": "Medicine",
            "domain_code": "0x01",
            "axes": {
                "x_axis": {"name": "organ", "description": "organ system"},
                "y_axis": {"name": "phase"},
                "z_axis": {"name": "abstraction"}
            },
            "keyword_map": {
                "心臓": {"axis": "x", "coord": 28},
                "肺": {"axis": "x", "coord": 42},
                "診断": {"axis": "y", "coord": 35}
            }
        },
        "legal": {
            "domain_name": "Law",
            "domain_code": 2,
            "midpoint": [10, 20, 30],
            "keyword_map": {
                "契約": {"axis": "x", "coord": 15},
                "判例": {"axis": "y", "coord": 70}
            }
        }
    }"#;

    #[test]
    fn test_registry_from_document() {
        let registry = DomainRegistry::from_json_str(DOC).unwrap();
        assert_eq!(registry.list_domains(), ["medical", "legal"]);

        let medical = registry.get("medical").unwrap();
        assert_eq!(medical.domain_code, 1);
        assert_eq!(medical.name, "Medicine");
        assert_eq!(medical.axis(Axis::X).description, "organ system");
        assert_eq!(medical.midpoint, DEFAULT_MIDPOINT);

        let legal = registry.by_code(2).unwrap();
        assert_eq!(legal.id, "legal");
        assert_eq!(legal.midpoint, [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_keyword_order_is_document_order() {
        let registry = DomainRegistry::from_json_str(DOC).unwrap();
        let keywords: Vec<_> = registry
            .get("legal")
            .unwrap()
            .keywords
            .iter()
            .map(|k| k.keyword.as_str())
            .collect();
        // "契約" sorts after "判例" by code point; document order must win.
        assert_eq!(keywords, ["契約", "判例"]);
    }

    #[test]
    fn test_unknown_domain() {
        let registry = DomainRegistry::from_json_str(DOC).unwrap();
        assert!(registry.get("finance").is_none());
        let err = registry.require("finance").unwrap_err();
        assert!(err.to_string().contains("medical, legal"));
    }

    #[test]
    fn test_bad_domain_code() {
        let doc = r#"{"x": {"domain_code": "0x1FF"}}"#;
        assert!(matches!(
            DomainRegistry::from_json_str(doc).unwrap_err(),
            TileDbError::Schema(_)
        ));
    }

    #[test]
    fn test_bad_axis_name() {
        let doc = r#"{"x": {"domain_code": 1, "keyword_map": {"k": {"axis": "w", "coord": 1}}}}"#;
        assert!(DomainRegistry::from_json_str(doc).is_err());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut registry = DomainRegistry::new();
        registry.insert(DomainSchema::new("a", 1)).unwrap();
        assert!(registry.insert(DomainSchema::new("a", 2)).is_err());
        assert_eq!(registry.len(), 1);
    }
}
