//! # Structural Elements
//!
//! A structural element (floor joists, roof rafters, stud walls, ...) bundles
//! the loading and design assumptions its span table was produced under with
//! the table itself.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "description": "Timber joists supporting floors in domestic buildings",
//!   "loading": { "dead_load": 0.25, "imposed_load": 1.5, "total_load": 1.75, "unit": "kN/m²" },
//!   "design_criteria": {
//!     "deflection_limit": "span/333",
//!     "end_conditions": "simply_supported",
//!     "bearing_length": "minimum 40mm",
//!     "service_class": "1 (dry conditions)"
//!   },
//!   "spans": { "C16": { "47x100": { "400": { "max_span": 2.15, ... } } } }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};
use crate::tables::{ConditionKind, GradeTable};

/// Unit string used for all area loads
pub const LOAD_UNIT: &str = "kN/m²";

/// Well-known element names
pub mod names {
    pub const FLOOR_JOISTS: &str = "floor_joists";
    pub const CEILING_JOISTS: &str = "ceiling_joists";
    pub const ROOF_RAFTERS: &str = "roof_rafters";
    pub const STAIR_STRINGERS: &str = "stair_stringers";
    pub const STUD_WALLS: &str = "stud_walls";
}

// ============================================================================
// Loading
// ============================================================================

/// Characteristic area loads assumed by a table (kN/m²)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAssumption {
    pub dead_load: f64,
    pub imposed_load: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow_load: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_load: Option<f64>,
    /// Concentrated load (kN) where the scenario specifies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentrated_load: Option<f64>,
    pub total_load: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

fn default_unit() -> String {
    LOAD_UNIT.to_string()
}

impl LoadAssumption {
    pub fn new(dead_load: f64, imposed_load: f64, total_load: f64) -> Self {
        LoadAssumption {
            dead_load,
            imposed_load,
            snow_load: None,
            wind_load: None,
            concentrated_load: None,
            total_load,
            unit: default_unit(),
            notes: String::new(),
        }
    }

    pub fn with_snow(mut self, snow_load: f64) -> Self {
        self.snow_load = Some(snow_load);
        self
    }

    pub fn with_wind(mut self, wind_load: f64) -> Self {
        self.wind_load = Some(wind_load);
        self
    }

    pub fn with_concentrated(mut self, concentrated_load: f64) -> Self {
        self.concentrated_load = Some(concentrated_load);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Reject negative or non-finite loads
    pub fn validate(&self) -> SpanResult<()> {
        let components = [
            ("dead_load", Some(self.dead_load)),
            ("imposed_load", Some(self.imposed_load)),
            ("snow_load", self.snow_load),
            ("wind_load", self.wind_load),
            ("concentrated_load", self.concentrated_load),
            ("total_load", Some(self.total_load)),
        ];
        for (field, value) in components {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(SpanError::invalid_input(field, v.to_string(), "Load must be finite and non-negative"));
                }
            }
        }
        Ok(())
    }
}

/// One load assumption for the whole table, or one per named scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loading {
    Uniform(LoadAssumption),
    PerScenario(BTreeMap<String, LoadAssumption>),
}

impl Loading {
    /// Load assumption for a scenario (the uniform one applies to all)
    pub fn for_scenario(&self, scenario: Option<&str>) -> Option<&LoadAssumption> {
        match (self, scenario) {
            (Loading::Uniform(load), _) => Some(load),
            (Loading::PerScenario(map), Some(name)) => map.get(name),
            (Loading::PerScenario(_), None) => None,
        }
    }
}

// ============================================================================
// Design criteria
// ============================================================================

/// What a deflection limit is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeflectionBasis {
    Span,
    Height,
}

/// Deflection limit written as "span/333" or "height/200"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeflectionLimit {
    pub basis: DeflectionBasis,
    pub ratio: u32,
}

impl DeflectionLimit {
    pub fn span(ratio: u32) -> Self {
        DeflectionLimit {
            basis: DeflectionBasis::Span,
            ratio,
        }
    }

    pub fn height(ratio: u32) -> Self {
        DeflectionLimit {
            basis: DeflectionBasis::Height,
            ratio,
        }
    }

    pub fn parse(s: &str) -> SpanResult<Self> {
        let (basis, ratio) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| SpanError::invalid_input("deflection_limit", s, "Expected 'span/N' or 'height/N'"))?;
        let basis = match basis.trim().to_lowercase().as_str() {
            "span" | "l" => DeflectionBasis::Span,
            "height" | "h" => DeflectionBasis::Height,
            _ => return Err(SpanError::invalid_input("deflection_limit", s, "Basis must be 'span' or 'height'")),
        };
        let ratio: u32 = ratio
            .trim()
            .parse()
            .map_err(|_| SpanError::invalid_input("deflection_limit", s, "Ratio must be a whole number"))?;
        if ratio == 0 {
            return Err(SpanError::invalid_input("deflection_limit", s, "Ratio must be positive"));
        }
        Ok(DeflectionLimit { basis, ratio })
    }

    /// Allowable deflection in mm for a member of the given length in metres
    pub fn allowable_mm(&self, length_m: f64) -> f64 {
        length_m * 1000.0 / f64::from(self.ratio)
    }
}

impl TryFrom<String> for DeflectionLimit {
    type Error = SpanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeflectionLimit> for String {
    fn from(limit: DeflectionLimit) -> Self {
        limit.to_string()
    }
}

impl std::fmt::Display for DeflectionLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let basis = match self.basis {
            DeflectionBasis::Span => "span",
            DeflectionBasis::Height => "height",
        };
        write!(f, "{}/{}", basis, self.ratio)
    }
}

/// Design assumptions a table was produced under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignCriteria {
    pub deflection_limit: DeflectionLimit,
    pub end_conditions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing_length: Option<String>,
    pub service_class: String,
    /// Element-specific notes (buckling check, maximum pitch, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl DesignCriteria {
    pub fn new(deflection_limit: DeflectionLimit, end_conditions: impl Into<String>) -> Self {
        DesignCriteria {
            deflection_limit,
            end_conditions: end_conditions.into(),
            bearing_length: None,
            service_class: "1 (dry conditions)".to_string(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_bearing_length(mut self, bearing_length: impl Into<String>) -> Self {
        self.bearing_length = Some(bearing_length.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Element
// ============================================================================

/// Whether a table lists spans or heights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    Span,
    Height,
}

impl Measure {
    pub fn display_name(&self) -> &'static str {
        match self {
            Measure::Span => "span",
            Measure::Height => "height",
        }
    }
}

/// A named category of structural member and its span table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawElement", into = "RawElement")]
pub struct StructuralElement {
    /// Key in the database (e.g. "floor_joists"); not part of the element body
    pub name: String,
    pub description: String,
    pub loading: Loading,
    pub design_criteria: DesignCriteria,
    pub measure: Measure,
    pub grade_table: GradeTable,
}

impl StructuralElement {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        loading: Loading,
        design_criteria: DesignCriteria,
    ) -> Self {
        StructuralElement {
            name: name.into(),
            description: description.into(),
            loading,
            design_criteria,
            measure: Measure::Span,
            grade_table: GradeTable::new(),
        }
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_grade_table(mut self, grade_table: GradeTable) -> Self {
        self.grade_table = grade_table;
        self
    }

    /// Condition kinds used anywhere in the table (one is expected)
    pub fn condition_kinds(&self) -> BTreeSet<ConditionKind> {
        self.grade_table.iter().map(|(_, _, cond, _)| cond.kind()).collect()
    }

    /// The single condition kind of this element, if the table is non-empty
    /// and consistent.
    pub fn condition_kind(&self) -> Option<ConditionKind> {
        let kinds = self.condition_kinds();
        if kinds.len() == 1 {
            kinds.into_iter().next()
        } else {
            None
        }
    }
}

/// Document form of an element body
#[derive(Clone, Serialize, Deserialize)]
struct RawElement {
    #[serde(default, skip_serializing)]
    name: String,
    description: String,
    loading: Loading,
    design_criteria: DesignCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spans: Option<GradeTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heights: Option<GradeTable>,
}

impl TryFrom<RawElement> for StructuralElement {
    type Error = SpanError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        let (measure, grade_table) = match (raw.spans, raw.heights) {
            (Some(spans), None) => (Measure::Span, spans),
            (None, Some(heights)) => (Measure::Height, heights),
            (None, None) => (Measure::Span, GradeTable::new()),
            (Some(_), Some(_)) => {
                return Err(SpanError::invalid_input(
                    "structural_element",
                    raw.description,
                    "An element holds either 'spans' or 'heights', not both",
                ))
            }
        };
        Ok(StructuralElement {
            name: raw.name,
            description: raw.description,
            loading: raw.loading,
            design_criteria: raw.design_criteria,
            measure,
            grade_table,
        })
    }
}

impl From<StructuralElement> for RawElement {
    fn from(element: StructuralElement) -> Self {
        let (spans, heights) = match element.measure {
            Measure::Span => (Some(element.grade_table), None),
            Measure::Height => (None, Some(element.grade_table)),
        };
        RawElement {
            name: element.name,
            description: element.description,
            loading: element.loading,
            design_criteria: element.design_criteria,
            spans,
            heights,
        }
    }
}
