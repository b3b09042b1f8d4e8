//! # Engine Configuration
//!
//! Rule table and registries the derivation engine and validator run with.
//! The defaults are compiled in; `config/span_rules.toml` carries the same
//! values in a reviewable file and can be loaded instead.
//!
//! ## Example
//!
//! ```rust
//! use span_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     spacing_options = ["400", "600"]
//!     grades_available = ["C16", "C24", "C30"]
//!
//!     [grade_ratios]
//!     decimals = 2
//!
//!     [[grade_ratios.steps]]
//!     from = "C16"
//!     to = "C24"
//!     ratio = 1.09
//!
//!     [[grade_ratios.steps]]
//!     from = "C24"
//!     to = "C30"
//!     ratio = 1.06
//! "#).unwrap();
//! assert_eq!(config.spacing_options.len(), 2);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};
use crate::ratios::GradeRatios;
use crate::timber::{Spacing, StrengthGrade, StrengthProperty, TimberSpecifications};

/// Rule table shipped with the crate
pub const DEFAULT_RULES_TOML: &str = include_str!("../config/span_rules.toml");

/// Settings for derivation and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Authoritative spacing registry
    pub spacing_options: Vec<Spacing>,

    /// Grades a database may tabulate, ascending
    pub grades_available: Vec<StrengthGrade>,

    pub grade_ratios: GradeRatios,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            spacing_options: vec![Spacing::S400, Spacing::S450, Spacing::S600],
            grades_available: StrengthGrade::ALL.to_vec(),
            grade_ratios: GradeRatios::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and check a TOML rule table
    pub fn from_toml_str(s: &str) -> SpanResult<Self> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| SpanError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML rule table from disk
    pub fn from_file(path: &Path) -> SpanResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SpanError::file_error("read config", path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// The rule table embedded from `config/span_rules.toml`
    pub fn embedded() -> SpanResult<Self> {
        Self::from_toml_str(DEFAULT_RULES_TOML)
    }

    pub fn to_toml_string(&self) -> SpanResult<String> {
        toml::to_string_pretty(self).map_err(|e| SpanError::config(e.to_string()))
    }

    pub fn validate(&self) -> SpanResult<()> {
        self.grade_ratios.validate()?;

        if self.spacing_options.is_empty() {
            return Err(SpanError::config("spacing_options must list at least one spacing"));
        }
        if !self.spacing_options.windows(2).all(|w| w[0] < w[1]) {
            return Err(SpanError::config("spacing_options must be strictly ascending"));
        }
        if self.grades_available.is_empty() {
            return Err(SpanError::config("grades_available must list at least one grade"));
        }
        if !self.grades_available.windows(2).all(|w| w[0] < w[1]) {
            return Err(SpanError::config("grades_available must be strictly ascending"));
        }
        // Grade ratios join adjacent grades only
        if !self.grades_available.windows(2).all(|w| w[0].higher() == Some(w[1])) {
            return Err(SpanError::config(format!(
                "grades_available must be adjacent grades with no gaps, got {:?}",
                self.grades_available
            )));
        }
        Ok(())
    }

    /// Timber specifications block matching this configuration
    pub fn timber_specifications(&self) -> TimberSpecifications {
        let mut specs = TimberSpecifications::with_spacings(self.spacing_options.clone());
        self.apply_to(&mut specs);
        specs
    }

    /// Overwrite a document's grade and spacing registry with this
    /// configuration's. Registered sizes are kept.
    pub fn apply_to(&self, specs: &mut TimberSpecifications) {
        specs.grades_available = self.grades_available.clone();
        specs.spacing_options = self.spacing_options.clone();
        specs.strength_properties = self
            .grades_available
            .iter()
            .map(|g| (*g, StrengthProperty::for_grade(*g)))
            .collect();
    }
}
