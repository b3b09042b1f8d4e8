//! # Span Database
//!
//! The `SpanDatabase` is the root container: every structural element plus
//! the catalogue metadata describing where the numbers came from.
//!
//! ## Structure
//!
//! ```text
//! SpanDatabase
//! ├── meta: DatabaseMeta (title, schema version, source catalogue, validation status)
//! ├── elements: BTreeMap<String, StructuralElement>  ("structural_elements" in JSON)
//! ├── timber_specifications: TimberSpecifications (grades, sizes, spacings)
//! └── usage_notes: Vec<String>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use span_core::database::SpanDatabase;
//!
//! let db = SpanDatabase::new("UK Structural Timber Span Tables");
//! let json = serde_json::to_string_pretty(&db).unwrap();
//! assert!(json.contains("structural_elements"));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elements::StructuralElement;
use crate::errors::{SpanError, SpanResult};
use crate::timber::TimberSpecifications;

/// Current schema version of the span table document
pub const SCHEMA_VERSION: &str = "0.3.0";

/// Default guidance disclaimer
pub const DISCLAIMER: &str = "This data is compiled from industry sources for guidance only. \
Always consult a qualified structural engineer for definitive calculations.";

/// Root span table container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDatabase", into = "RawDatabase")]
pub struct SpanDatabase {
    pub meta: DatabaseMeta,
    pub elements: BTreeMap<String, StructuralElement>,
    pub timber_specifications: TimberSpecifications,
    pub usage_notes: Vec<String>,
}

impl SpanDatabase {
    /// Create an empty database with default timber specifications.
    pub fn new(title: impl Into<String>) -> Self {
        SpanDatabase {
            meta: DatabaseMeta::new(title),
            elements: BTreeMap::new(),
            timber_specifications: TimberSpecifications::default(),
            usage_notes: Vec::new(),
        }
    }

    /// Add an element, keyed by its name. Replaces an element of the same name.
    pub fn add_element(&mut self, element: StructuralElement) -> Option<StructuralElement> {
        self.elements.insert(element.name.clone(), element)
    }

    pub fn element(&self, name: &str) -> SpanResult<&StructuralElement> {
        self.elements
            .get(name)
            .ok_or_else(|| SpanError::unknown_key("element", name))
    }

    pub fn element_mut(&mut self, name: &str) -> SpanResult<&mut StructuralElement> {
        self.elements
            .get_mut(name)
            .ok_or_else(|| SpanError::unknown_key("element", name))
    }

    /// Total number of tabulated entries across all elements
    pub fn entry_count(&self) -> usize {
        self.elements.values().map(|e| e.grade_table.entry_count()).sum()
    }

    pub fn with_usage_notes<I, S>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usage_notes.extend(notes.into_iter().map(Into::into));
        self
    }
}

/// Document header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMeta {
    pub title: String,

    /// Schema version (for migration compatibility)
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,

    /// Catalogue of sources cited by entry tags
    #[serde(default)]
    pub sources: Vec<SourceRecord>,

    #[serde(default)]
    pub validation_status: ValidationStatus,
}

impl DatabaseMeta {
    pub fn new(title: impl Into<String>) -> Self {
        DatabaseMeta {
            title: title.into(),
            version: SCHEMA_VERSION.to_string(),
            created_date: Some(Utc::now()),
            data_status: None,
            disclaimer: Some(DISCLAIMER.to_string()),
            sources: Vec::new(),
            validation_status: ValidationStatus::default(),
        }
    }
}

/// One entry in the source catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        SourceRecord {
            name: name.into(),
            version: None,
            status: status.into(),
            url: None,
            notes: None,
        }
    }
}

/// Review state recorded alongside the tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatus {
    #[serde(default)]
    pub cross_referenced: bool,
    #[serde(default)]
    pub engineer_reviewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<String>,
}

/// Document form: element names live in the map keys
#[derive(Clone, Serialize, Deserialize)]
struct RawDatabase {
    meta: DatabaseMeta,
    structural_elements: BTreeMap<String, StructuralElement>,
    timber_specifications: TimberSpecifications,
    #[serde(default)]
    usage_notes: Vec<String>,
}

impl TryFrom<RawDatabase> for SpanDatabase {
    type Error = SpanError;

    fn try_from(raw: RawDatabase) -> Result<Self, Self::Error> {
        let elements = raw
            .structural_elements
            .into_iter()
            .map(|(name, mut element)| {
                element.name = name.clone();
                (name, element)
            })
            .collect();
        Ok(SpanDatabase {
            meta: raw.meta,
            elements,
            timber_specifications: raw.timber_specifications,
            usage_notes: raw.usage_notes,
        })
    }
}

impl From<SpanDatabase> for RawDatabase {
    fn from(db: SpanDatabase) -> Self {
        RawDatabase {
            meta: db.meta,
            structural_elements: db.elements,
            timber_specifications: db.timber_specifications,
            usage_notes: db.usage_notes,
        }
    }
}
