//! Strength Classes (BS EN 338)
//!
//! Softwood strength classes used in UK domestic span tables, ordered by
//! characteristic bending strength fm,k.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};

/// Timber strength class
///
/// The derived `Ord` follows declaration order, which is also the order of
/// increasing bending strength: `C16 < C24 < C30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrengthGrade {
    /// fm,k = 16 N/mm² - standard UK-grown softwood
    C16,
    /// fm,k = 24 N/mm² - higher grade, typically imported
    C24,
    /// fm,k = 30 N/mm² - premium grade for longer spans
    C30,
}

impl StrengthGrade {
    /// All grades in ascending strength order
    pub const ALL: [StrengthGrade; 3] = [StrengthGrade::C16, StrengthGrade::C24, StrengthGrade::C30];

    /// Characteristic bending strength fm,k in N/mm²
    pub fn bending_strength_n_mm2(&self) -> f64 {
        match self {
            StrengthGrade::C16 => 16.0,
            StrengthGrade::C24 => 24.0,
            StrengthGrade::C30 => 30.0,
        }
    }

    /// Code string as it appears in the span table document (e.g. "C24")
    pub fn code(&self) -> &'static str {
        match self {
            StrengthGrade::C16 => "C16",
            StrengthGrade::C24 => "C24",
            StrengthGrade::C30 => "C30",
        }
    }

    /// Lowercase tag fragment used in provenance (e.g. "c16")
    pub fn tag(&self) -> &'static str {
        match self {
            StrengthGrade::C16 => "c16",
            StrengthGrade::C24 => "c24",
            StrengthGrade::C30 => "c30",
        }
    }

    /// Next weaker grade, if any
    pub fn lower(&self) -> Option<StrengthGrade> {
        match self {
            StrengthGrade::C16 => None,
            StrengthGrade::C24 => Some(StrengthGrade::C16),
            StrengthGrade::C30 => Some(StrengthGrade::C24),
        }
    }

    /// Next stronger grade, if any
    pub fn higher(&self) -> Option<StrengthGrade> {
        match self {
            StrengthGrade::C16 => Some(StrengthGrade::C24),
            StrengthGrade::C24 => Some(StrengthGrade::C30),
            StrengthGrade::C30 => None,
        }
    }

    /// Parse from common string representations ("C24", "c24", "24")
    pub fn from_str_flexible(s: &str) -> SpanResult<Self> {
        match s.trim().to_uppercase().trim_start_matches('C') {
            "16" => Ok(StrengthGrade::C16),
            "24" => Ok(StrengthGrade::C24),
            "30" => Ok(StrengthGrade::C30),
            _ => Err(SpanError::unknown_key("grade", s)),
        }
    }
}

impl FromStr for StrengthGrade {
    type Err = SpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s)
    }
}

impl std::fmt::Display for StrengthGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Strength property record kept in the timber specifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthProperty {
    /// Characteristic bending strength (N/mm²)
    pub fm_k: f64,
    pub description: String,
}

impl StrengthProperty {
    /// Default description for a grade
    pub fn for_grade(grade: StrengthGrade) -> Self {
        let description = match grade {
            StrengthGrade::C16 => "Standard UK softwood grade",
            StrengthGrade::C24 => "Higher grade, typically imported",
            StrengthGrade::C30 => "Premium grade for longer spans",
        };
        StrengthProperty {
            fm_k: grade.bending_strength_n_mm2(),
            description: description.to_string(),
        }
    }
}
