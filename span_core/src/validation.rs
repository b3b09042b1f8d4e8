//! # Consistency Validator
//!
//! Read-only checks run over a whole database before it is shipped.
//!
//! | Check                                         | Severity |
//! |-----------------------------------------------|----------|
//! | Span falls from a lower to a higher grade     | error    |
//! | Span rises as spacing widens                  | error    |
//! | Medium/low confidence entry with no method tag| error    |
//! | Element mixes condition key shapes            | error    |
//! | Larger section spans less than a smaller one  | warning  |
//! | Grade, size or spacing missing from registry  | warning  |
//!
//! Findings are collected, never raised. Use
//! [`ValidationReport::ensure_passed`] to turn a failed report into an error.
//!
//! ## Example
//!
//! ```rust
//! use span_core::database::SpanDatabase;
//! use span_core::validation::validate;
//!
//! let db = SpanDatabase::new("Empty");
//! let report = validate(&db);
//! assert!(report.passed);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::database::SpanDatabase;
use crate::elements::StructuralElement;
use crate::errors::{SpanError, SpanResult};
use crate::tables::ConditionKey;
use crate::timber::{SectionSize, Spacing, StrengthGrade, TimberSpecifications};

/// Outcome of a validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        ValidationReport {
            passed: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Fail with `ValidationFailed` unless the report passed
    pub fn ensure_passed(&self) -> SpanResult<()> {
        if self.passed {
            return Ok(());
        }
        Err(SpanError::ValidationFailed {
            error_count: self.errors.len(),
            first_error: self.errors.first().cloned().unwrap_or_default(),
        })
    }
}

/// Validate every element against the default engine configuration
pub fn validate(database: &SpanDatabase) -> ValidationReport {
    validate_with(&EngineConfig::default(), database)
}

/// Validate every element in the database.
///
/// Grade and spacing membership are checked against `config`, which is the
/// registry authority; sizes are checked against the document's own
/// `timber_specifications`, which grows as sections are derived. A document
/// whose registry lists a grade or spacing the configuration does not offer
/// gets a warning too.
pub fn validate_with(config: &EngineConfig, database: &SpanDatabase) -> ValidationReport {
    let mut checker = Checker::new(config, &database.timber_specifications);
    checker.check_declared_registry();
    for element in database.elements.values() {
        checker.check_element(element);
    }
    let report = ValidationReport::from_findings(checker.errors, checker.warnings);
    info!(
        elements = database.elements.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        passed = report.passed,
        "validation complete"
    );
    report
}

/// Validate a single element against a configuration and size registry
pub fn validate_element(
    element: &StructuralElement,
    config: &EngineConfig,
    specs: &TimberSpecifications,
) -> ValidationReport {
    let mut checker = Checker::new(config, specs);
    checker.check_element(element);
    ValidationReport::from_findings(checker.errors, checker.warnings)
}

// ============================================================================
// Checks
// ============================================================================

struct Checker<'a> {
    config: &'a EngineConfig,
    specs: &'a TimberSpecifications,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(config: &'a EngineConfig, specs: &'a TimberSpecifications) -> Self {
        Checker {
            config,
            specs,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Document registry entries the configuration does not offer
    fn check_declared_registry(&mut self) {
        for grade in &self.specs.grades_available {
            if !self.config.grades_available.contains(grade) {
                self.warnings.push(format!(
                    "timber specifications list grade {}, which the engine configuration does not offer",
                    grade
                ));
            }
        }
        for spacing in &self.specs.spacing_options {
            if !self.config.spacing_options.contains(spacing) {
                self.warnings.push(format!(
                    "timber specifications list spacing {}, which the engine configuration does not offer",
                    spacing
                ));
            }
        }
    }

    fn check_element(&mut self, element: &StructuralElement) {
        self.check_condition_kinds(element);
        self.check_grade_order(element);
        self.check_spacing_order(element);
        self.check_size_order(element);
        self.check_provenance(element);
        self.check_registry(element);
    }

    fn check_condition_kinds(&mut self, element: &StructuralElement) {
        let kinds = element.condition_kinds();
        if kinds.len() > 1 {
            self.errors.push(format!(
                "{}: mixes condition key shapes {:?}",
                element.name,
                kinds.into_iter().collect::<Vec<_>>()
            ));
        }
    }

    /// Non-decreasing across present grades, per (size, condition)
    fn check_grade_order(&mut self, element: &StructuralElement) {
        let table = &element.grade_table;
        for (size, condition) in table.slots() {
            let present: Vec<(StrengthGrade, f64)> = StrengthGrade::ALL
                .iter()
                .filter_map(|g| table.get(*g, size, &condition).map(|e| (*g, e.value())))
                .collect();
            for pair in present.windows(2) {
                let (lo_grade, lo) = pair[0];
                let (hi_grade, hi) = pair[1];
                if hi < lo {
                    self.errors.push(format!(
                        "{}: {} < {} span at {} {} ({} < {})",
                        element.name, hi_grade, lo_grade, size, condition, hi, lo
                    ));
                }
            }
        }
    }

    /// Non-increasing as spacing widens, per (grade, size, scenario)
    fn check_spacing_order(&mut self, element: &StructuralElement) {
        let mut runs: BTreeMap<(StrengthGrade, SectionSize, Option<&str>), Vec<(Spacing, f64)>> = BTreeMap::new();
        for (grade, size, condition, entry) in element.grade_table.iter() {
            if let Some(spacing) = condition.spacing() {
                runs.entry((grade, size, condition.scenario()))
                    .or_default()
                    .push((spacing, entry.value()));
            }
        }

        for ((grade, size, scenario), mut run) in runs {
            run.sort_by_key(|(spacing, _)| *spacing);
            for pair in run.windows(2) {
                let (narrow, narrow_value) = pair[0];
                let (wide, wide_value) = pair[1];
                if wide_value > narrow_value {
                    let scenario = scenario.map(|s| format!(" {}", s)).unwrap_or_default();
                    self.errors.push(format!(
                        "{}: {} {}{} span at {} exceeds {} ({} > {})",
                        element.name, grade, size, scenario, wide, narrow, wide_value, narrow_value
                    ));
                }
            }
        }
    }

    /// Larger sections should not span less, per (grade, condition)
    fn check_size_order(&mut self, element: &StructuralElement) {
        let mut runs: BTreeMap<(StrengthGrade, &ConditionKey), Vec<(SectionSize, f64)>> = BTreeMap::new();
        for (grade, size, condition, entry) in element.grade_table.iter() {
            runs.entry((grade, condition)).or_default().push((size, entry.value()));
        }

        for ((grade, condition), mut run) in runs {
            run.sort_by_key(|(size, _)| *size);
            for pair in run.windows(2) {
                let (small, small_value) = pair[0];
                let (large, large_value) = pair[1];
                if large_value < small_value {
                    self.warnings.push(format!(
                        "{}: {} {} spans less than {} at {} ({} < {})",
                        element.name, grade, large, small, condition, large_value, small_value
                    ));
                }
            }
        }
    }

    fn check_provenance(&mut self, element: &StructuralElement) {
        for (grade, size, condition, entry) in element.grade_table.iter() {
            let provenance = entry.provenance();
            if !provenance.is_documented() {
                self.errors.push(format!(
                    "{}: {} {} {} has {} confidence but no calculated/estimated source tag",
                    element.name, grade, size, condition, provenance.confidence
                ));
            }
        }
    }

    fn check_registry(&mut self, element: &StructuralElement) {
        let table = &element.grade_table;
        for grade in table.grades() {
            if !self.config.grades_available.contains(&grade) {
                self.warnings
                    .push(format!("{}: grade {} is not in the timber specifications", element.name, grade));
            }
        }

        let mut sizes: Vec<SectionSize> = table.slots().into_iter().map(|(size, _)| size).collect();
        sizes.dedup();
        for size in sizes {
            if !self.specs.offers_size(size) {
                self.warnings
                    .push(format!("{}: size {} is not in the timber specifications", element.name, size));
            }
        }

        let mut spacings: Vec<Spacing> = table.slots().iter().filter_map(|(_, c)| c.spacing()).collect();
        spacings.sort();
        spacings.dedup();
        for spacing in spacings {
            if !self.config.spacing_options.contains(&spacing) {
                self.warnings.push(format!(
                    "{}: spacing {} is not in the timber specifications",
                    element.name, spacing
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{names, DeflectionLimit, DesignCriteria, LoadAssumption, Loading};
    use crate::tables::{ConfidenceLevel, Provenance, SpanEntry};

    const S47X150: SectionSize = SectionSize::new(47, 150);
    const S47X200: SectionSize = SectionSize::new(47, 200);

    fn entry(value: f64) -> SpanEntry {
        SpanEntry::sourced(value, ["trada_typical"], "").unwrap()
    }

    fn joists() -> StructuralElement {
        StructuralElement::new(
            names::FLOOR_JOISTS,
            "Floor joists",
            Loading::Uniform(LoadAssumption::new(0.25, 1.5, 1.75)),
            DesignCriteria::new(DeflectionLimit::span(333), "simply_supported"),
        )
    }

    fn db_with(element: StructuralElement) -> SpanDatabase {
        let mut db = SpanDatabase::new("Test Tables");
        db.add_element(element);
        db
    }

    fn consistent_joists() -> StructuralElement {
        let mut element = joists();
        let t = &mut element.grade_table;
        t.insert(StrengthGrade::C16, S47X150, Spacing::S400.into(), entry(3.28));
        t.insert(StrengthGrade::C16, S47X150, Spacing::S600.into(), entry(2.78));
        t.insert(StrengthGrade::C24, S47X150, Spacing::S400.into(), entry(3.58));
        t.insert(StrengthGrade::C16, S47X200, Spacing::S400.into(), entry(4.38));
        element
    }

    #[test]
    fn test_consistent_database_passes() {
        let report = validate(&db_with(consistent_joists()));
        assert!(report.passed);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert!(report.ensure_passed().is_ok());
    }

    #[test]
    fn test_inverted_grade_pair_is_one_error() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C24, S47X150, Spacing::S400.into(), entry(3.10));

        let report = validate(&db_with(element));
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        let message = &report.errors[0];
        assert!(message.contains("floor_joists"));
        assert!(message.contains("47x150"));
        assert!(message.contains("400mm"));
        assert!(message.contains("C24 < C16"));
        assert!(message.contains("3.1") && message.contains("3.28"));
    }

    #[test]
    fn test_grade_gap_compares_present_grades() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S400.into(), entry(3.28));
        element
            .grade_table
            .insert(StrengthGrade::C30, S47X150, Spacing::S400.into(), entry(3.20));

        let report = validate(&db_with(element));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("C30 < C16"));
    }

    #[test]
    fn test_spacing_increase_is_error() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S450.into(), entry(3.30));

        let report = validate(&db_with(element));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("450mm exceeds 400mm"));
    }

    #[test]
    fn test_spacing_order_per_scenario() {
        let mut walls = joists();
        walls.name = names::STUD_WALLS.to_string();
        let size = SectionSize::new(38, 89);
        let t = &mut walls.grade_table;
        t.insert(StrengthGrade::C16, size, ConditionKey::scenario_at("partition_wall", Spacing::S400), entry(3.0));
        t.insert(StrengthGrade::C16, size, ConditionKey::scenario_at("partition_wall", Spacing::S600), entry(2.8));
        // A different scenario at a wider spacing is not compared with partition walls
        t.insert(StrengthGrade::C16, size, ConditionKey::scenario_at("external_wall", Spacing::S400), entry(2.5));
        t.insert(StrengthGrade::C16, size, ConditionKey::scenario_at("external_wall", Spacing::S600), entry(2.2));

        let report = validate_element(&walls, &EngineConfig::default(), &TimberSpecifications::default());
        assert!(report.passed, "{:?}", report.errors);
    }

    #[test]
    fn test_size_inversion_only_warns() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X200, Spacing::S600.into(), entry(2.50));

        let report = validate(&db_with(element));
        assert!(report.passed);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("47x200 spans less than 47x150"));
    }

    #[test]
    fn test_undocumented_medium_entry_is_error() {
        let mut element = consistent_joists();
        let provenance = Provenance::new(ConfidenceLevel::Medium, ["engineering_practice"], "").unwrap();
        element.grade_table.insert(
            StrengthGrade::C30,
            S47X150,
            Spacing::S400.into(),
            SpanEntry::new(3.80, provenance).unwrap(),
        );

        let report = validate(&db_with(element));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("medium confidence"));

        let err = report.ensure_passed().unwrap_err();
        match err {
            SpanError::ValidationFailed { error_count, first_error } => {
                assert_eq!(error_count, 1);
                assert!(first_error.contains("floor_joists"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_estimated_low_entry_is_documented() {
        let mut element = consistent_joists();
        let provenance = Provenance::new(ConfidenceLevel::Low, ["estimated_from_practice"], "").unwrap();
        element.grade_table.insert(
            StrengthGrade::C30,
            S47X150,
            Spacing::S400.into(),
            SpanEntry::new(3.80, provenance).unwrap(),
        );
        assert!(validate(&db_with(element)).passed);
    }

    #[test]
    fn test_mixed_condition_kinds_is_error() {
        let mut element = consistent_joists();
        element.grade_table.insert(
            StrengthGrade::C16,
            S47X200,
            ConditionKey::Scenario("domestic_cut".into()),
            entry(3.0),
        );
        let report = validate(&db_with(element));
        assert!(report.errors.iter().any(|e| e.contains("mixes condition key shapes")));
    }

    #[test]
    fn test_300mm_spacing_warns() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S300.into(), entry(3.50));

        let report = validate(&db_with(element));
        assert!(report.passed);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("spacing 300mm"));
    }

    #[test]
    fn test_unregistered_size_warns() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, SectionSize::new(47, 175), Spacing::S400.into(), entry(3.80));

        let report = validate(&db_with(element));
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("size 47x175")));
    }

    #[test]
    fn test_document_declared_300mm_still_warns() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, SectionSize::new(47, 100), Spacing::S300.into(), entry(2.60));
        let mut db = db_with(element);
        db.timber_specifications.spacing_options.insert(0, Spacing::S300);

        let report = validate(&db);
        assert!(report.passed);
        assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("list spacing 300mm") && w.contains("engine configuration")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.starts_with("floor_joists: spacing 300mm")));
    }

    #[test]
    fn test_configuration_decides_spacing_registry() {
        let mut element = consistent_joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, SectionSize::new(47, 100), Spacing::S300.into(), entry(2.60));
        let mut db = db_with(element);

        let mut config = EngineConfig::default();
        config.spacing_options.insert(0, Spacing::S300);
        db.timber_specifications = config.timber_specifications();

        let report = validate_with(&config, &db);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        // The same document under the default configuration
        assert_eq!(validate(&db).warnings.len(), 2);
    }

    #[test]
    fn test_unconfigured_grade_warns() {
        let mut config = EngineConfig::default();
        config.grades_available = vec![StrengthGrade::C16, StrengthGrade::C24];

        let element = {
            let mut element = consistent_joists();
            element
                .grade_table
                .insert(StrengthGrade::C30, S47X150, Spacing::S400.into(), entry(3.80));
            element
        };
        let report = validate_element(&element, &config, &config.timber_specifications());
        assert!(report.passed);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("grade C30"));
    }
}
