//! # Timber Specifications
//!
//! Keys of the span tables: strength grades, section sizes and member
//! spacings, plus the registry of which of them a database offers.
//!
//! ## Example
//!
//! ```rust
//! use span_core::timber::{SectionSize, Spacing, StrengthGrade};
//!
//! let size: SectionSize = "47x200".parse().unwrap();
//! assert_eq!(size.depth_mm, 200);
//! assert!(StrengthGrade::C16 < StrengthGrade::C24);
//! assert_eq!(Spacing::S450.mm(), 450);
//! ```

pub mod grades;
pub mod sizes;
pub mod spacing;

pub use grades::{StrengthGrade, StrengthProperty};
pub use sizes::{SectionSize, DEFAULT_SIZE_REGISTRY};
pub use spacing::Spacing;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Registry of grades, sizes and spacings a database offers.
///
/// Serialized as the `timber_specifications` block of the span table document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimberSpecifications {
    /// Grades in ascending strength order
    pub grades_available: Vec<StrengthGrade>,

    /// Sizes keyed by width class (e.g. "47mm_width")
    pub sizes_available: BTreeMap<String, Vec<SectionSize>>,

    /// Authoritative list of supported spacings
    pub spacing_options: Vec<Spacing>,

    #[serde(default)]
    pub strength_properties: BTreeMap<StrengthGrade, StrengthProperty>,
}

impl TimberSpecifications {
    /// Build the registry from an explicit spacing list and the default
    /// grades and sizes.
    pub fn with_spacings(spacing_options: Vec<Spacing>) -> Self {
        TimberSpecifications {
            grades_available: StrengthGrade::ALL.to_vec(),
            sizes_available: DEFAULT_SIZE_REGISTRY.clone(),
            spacing_options,
            strength_properties: StrengthGrade::ALL
                .iter()
                .map(|g| (*g, StrengthProperty::for_grade(*g)))
                .collect(),
        }
    }

    pub fn offers_grade(&self, grade: StrengthGrade) -> bool {
        self.grades_available.contains(&grade)
    }

    pub fn offers_size(&self, size: SectionSize) -> bool {
        self.sizes_available.values().any(|sizes| sizes.contains(&size))
    }

    pub fn offers_spacing(&self, spacing: Spacing) -> bool {
        self.spacing_options.contains(&spacing)
    }

    /// Register a size under its width class if it is not already listed
    pub fn register_size(&mut self, size: SectionSize) {
        let class = self.sizes_available.entry(size.width_class()).or_default();
        if !class.contains(&size) {
            class.push(size);
            class.sort();
        }
    }
}

impl Default for TimberSpecifications {
    /// The registry the default engine configuration describes
    fn default() -> Self {
        EngineConfig::default().timber_specifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_excludes_300() {
        let specs = TimberSpecifications::default();
        assert!(!specs.offers_spacing(Spacing::S300));
        assert!(specs.offers_spacing(Spacing::S400));
        assert!(specs.offers_grade(StrengthGrade::C30));
        assert!(specs.offers_size(SectionSize::new(50, 250)));
        assert!(!specs.offers_size(SectionSize::new(47, 75)));
    }

    #[test]
    fn test_default_registry_follows_engine_config() {
        let config = EngineConfig::default();
        let specs = TimberSpecifications::default();
        assert_eq!(specs.spacing_options, config.spacing_options);
        assert_eq!(specs.grades_available, config.grades_available);
    }

    #[test]
    fn test_register_size() {
        let mut specs = TimberSpecifications::default();
        specs.register_size(SectionSize::new(47, 75));
        specs.register_size(SectionSize::new(47, 75));
        let class = &specs.sizes_available["47mm_width"];
        assert_eq!(class.iter().filter(|s| **s == SectionSize::new(47, 75)).count(), 1);
        assert_eq!(class[0], SectionSize::new(47, 75));
    }

    #[test]
    fn test_specifications_serialization() {
        let specs = TimberSpecifications::default();
        let json = serde_json::to_string_pretty(&specs).unwrap();
        assert!(json.contains("\"47mm_width\""));
        assert!(json.contains("\"450\""));
        let parsed: TimberSpecifications = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, specs);
    }
}
