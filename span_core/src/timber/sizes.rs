//! Section Sizes
//!
//! Regularised UK softwood sections identified as `"<width>x<depth>"` in
//! millimetres (e.g. `47x200`). Sizes are ordered by depth, then width, which
//! is the order used when comparing spans across sizes.
//!
//! ## Width Classes
//!
//! The default registry groups the tabulated sizes by nominal width:
//!
//! | Width | Typical use                         |
//! |-------|-------------------------------------|
//! | 38mm  | Stud walls                          |
//! | 47mm  | Joists, rafters, stair stringers    |
//! | 50mm  | Stair stringers                     |
//! | 63mm  | Joists (wide series)                |
//! | 75mm  | Heavy joists                        |

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};

/// Cross-section size in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionSize {
    pub width_mm: u16,
    pub depth_mm: u16,
}

impl SectionSize {
    pub const fn new(width_mm: u16, depth_mm: u16) -> Self {
        SectionSize { width_mm, depth_mm }
    }

    /// Parse "47x200" (also accepts "47 x 200" and an upper-case X)
    pub fn parse(s: &str) -> SpanResult<Self> {
        let normalized = s.trim().to_lowercase().replace(' ', "");
        let (width, depth) = normalized
            .split_once('x')
            .ok_or_else(|| SpanError::invalid_input("size", s, "Expected '<width>x<depth>' in mm"))?;

        let width_mm: u16 = width
            .parse()
            .map_err(|_| SpanError::invalid_input("size", s, "Width is not a whole number of mm"))?;
        let depth_mm: u16 = depth
            .parse()
            .map_err(|_| SpanError::invalid_input("size", s, "Depth is not a whole number of mm"))?;

        if width_mm == 0 || depth_mm == 0 {
            return Err(SpanError::invalid_input("size", s, "Dimensions must be positive"));
        }
        Ok(SectionSize { width_mm, depth_mm })
    }

    /// Cross-sectional area (mm²)
    pub fn area_mm2(&self) -> f64 {
        f64::from(self.width_mm) * f64::from(self.depth_mm)
    }

    /// Elastic section modulus W = bh²/6 (mm³)
    pub fn section_modulus_mm3(&self) -> f64 {
        f64::from(self.width_mm) * f64::from(self.depth_mm).powi(2) / 6.0
    }

    /// Key of the width class this size belongs to (e.g. "47mm_width")
    pub fn width_class(&self) -> String {
        format!("{}mm_width", self.width_mm)
    }

    /// Display name (e.g. "47x200")
    pub fn display_name(&self) -> String {
        format!("{}x{}", self.width_mm, self.depth_mm)
    }
}

impl Ord for SectionSize {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth_mm
            .cmp(&other.depth_mm)
            .then(self.width_mm.cmp(&other.width_mm))
    }
}

impl PartialOrd for SectionSize {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SectionSize {
    type Err = SpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SectionSize {
    type Error = SpanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SectionSize> for String {
    fn from(size: SectionSize) -> Self {
        size.display_name()
    }
}

impl std::fmt::Display for SectionSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width_mm, self.depth_mm)
    }
}

// ============================================================================
// Default registry
// ============================================================================

/// Tabulated sizes per width class, keyed as in the span table document.
pub static DEFAULT_SIZE_REGISTRY: Lazy<BTreeMap<String, Vec<SectionSize>>> = Lazy::new(|| {
    let classes: [(u16, &[u16]); 5] = [
        (38, &[63, 89, 140, 184, 235]),
        (47, &[100, 150, 200, 225]),
        (50, &[200, 225, 250]),
        (63, &[100, 150, 200, 225]),
        (75, &[150, 200, 225, 250]),
    ];

    classes
        .iter()
        .map(|(width, depths)| {
            let sizes = depths.iter().map(|d| SectionSize::new(*width, *d)).collect();
            (format!("{}mm_width", width), sizes)
        })
        .collect()
});
