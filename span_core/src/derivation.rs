//! # Derivation Engine
//!
//! Fills the gaps in an element's grade table from the entries it already
//! has. Two rule families are applied:
//!
//! - **Grade scaling**: a slot at grade G is filled from the same slot at the
//!   grade directly below, multiplied by the adjacent grade ratio and rounded.
//!   C30 from C16 always goes through C24, so each step rounds on its own.
//! - **Size extrapolation**: a new section is filled from a tabulated
//!   neighbour section at every condition where the neighbour exists,
//!   multiplied by a fixed factor.
//!
//! Processing is one ascending pass over the grades. At each grade, grade
//! scaling runs first over every (size, condition) slot the table holds, then
//! the size rules. Slots are recomputed for every grade, so a section created
//! by a size rule at C16 is grade-scaled at C24 in the same pass.
//!
//! Existing entries are never replaced, which makes every operation here
//! idempotent.
//!
//! ## Example
//!
//! ```rust
//! use span_core::derivation::{DerivationEngine, DerivationRequest};
//! use span_core::elements::{names, DeflectionLimit, DesignCriteria, LoadAssumption, Loading, StructuralElement};
//! use span_core::tables::SpanEntry;
//! use span_core::timber::{SectionSize, Spacing, StrengthGrade};
//!
//! let mut element = StructuralElement::new(
//!     names::FLOOR_JOISTS,
//!     "Floor joists",
//!     Loading::Uniform(LoadAssumption::new(0.25, 1.5, 1.75)),
//!     DesignCriteria::new(DeflectionLimit::span(333), "simply_supported"),
//! );
//! let size = SectionSize::new(47, 100);
//! element.grade_table.insert(
//!     StrengthGrade::C16,
//!     size,
//!     Spacing::S400.into(),
//!     SpanEntry::sourced(2.15, ["trada_typical"], "").unwrap(),
//! );
//!
//! let engine = DerivationEngine::default();
//! let summary = engine.derive_missing(&mut element, &DerivationRequest::default()).unwrap();
//! assert_eq!(summary.derived.len(), 2);
//!
//! let c24 = element.grade_table.get(StrengthGrade::C24, size, &Spacing::S400.into()).unwrap();
//! assert_eq!(c24.value(), 2.34);
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::database::SpanDatabase;
use crate::elements::StructuralElement;
use crate::errors::{SpanError, SpanResult};
use crate::ratios::GradeRatios;
use crate::tables::{ConditionKey, GradeTable, Provenance, SpanEntry};
use crate::timber::{SectionSize, StrengthGrade};

// ============================================================================
// Requests
// ============================================================================

/// Which grades a derivation pass should fill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GradeSelection {
    /// Every configured grade above each slot's lowest populated grade.
    /// Slots with nothing below a grade are left alone.
    #[default]
    AboveFloor,

    /// Exactly these grades (plus any grade needed on the way up).
    /// A slot that cannot reach a listed grade is an error.
    Only(Vec<StrengthGrade>),
}

/// Extrapolate a new section from a tabulated neighbour
#[derive(Debug, Clone, PartialEq)]
pub struct SizeExtrapolation {
    pub target: SectionSize,
    pub reference: SectionSize,
    pub factor: f64,
    /// Engineering basis, copied into each derived entry's notes
    pub note: String,
}

impl SizeExtrapolation {
    pub fn new(target: SectionSize, reference: SectionSize, factor: f64, note: impl Into<String>) -> Self {
        SizeExtrapolation {
            target,
            reference,
            factor,
            note: note.into(),
        }
    }

    /// Whether the target is the smaller section (by depth, then width)
    pub fn derives_smaller(&self) -> bool {
        self.target < self.reference
    }

    /// Check the factor sits on the correct side of 1 for the direction
    pub fn validate(&self) -> SpanResult<()> {
        if self.target == self.reference {
            return Err(SpanError::invalid_input(
                "size_rule",
                self.target.to_string(),
                "Target and reference sections are the same",
            ));
        }
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(SpanError::invalid_input(
                "factor",
                self.factor.to_string(),
                "Size factor must be finite and positive",
            ));
        }
        if self.derives_smaller() && self.factor >= 1.0 {
            return Err(SpanError::invalid_input(
                "factor",
                self.factor.to_string(),
                format!("{} is smaller than {}; factor must be below 1", self.target, self.reference),
            ));
        }
        if !self.derives_smaller() && self.factor <= 1.0 {
            return Err(SpanError::invalid_input(
                "factor",
                self.factor.to_string(),
                format!("{} is larger than {}; factor must be above 1", self.target, self.reference),
            ));
        }
        Ok(())
    }

    /// Source tag written on every entry this rule produces
    pub fn method_tag(&self) -> String {
        format!("calculated_from_{}", self.reference)
    }

    /// Check a rounded result stays on the correct side of its reference
    fn check_result(&self, reference_value: f64, result: f64) -> SpanResult<()> {
        let ok = if self.derives_smaller() {
            result > 0.0 && result < reference_value
        } else {
            result > reference_value
        };
        if ok {
            Ok(())
        } else {
            Err(SpanError::invalid_input(
                "factor",
                self.factor.to_string(),
                format!(
                    "{} x {} rounds to {}, which does not extrapolate {} from {}",
                    reference_value, self.factor, result, self.target, self.reference
                ),
            ))
        }
    }
}

/// What to derive for one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationRequest {
    pub grades: GradeSelection,
    pub size_rules: Vec<SizeExtrapolation>,
}

impl DerivationRequest {
    /// Request a single explicit grade
    pub fn grade(grade: StrengthGrade) -> Self {
        DerivationRequest {
            grades: GradeSelection::Only(vec![grade]),
            size_rules: Vec::new(),
        }
    }

    pub fn with_size_rule(mut self, rule: SizeExtrapolation) -> Self {
        self.size_rules.push(rule);
        self
    }

    /// Highest grade this request may write, given the configured grades
    fn top_grade(&self, available: &[StrengthGrade]) -> Option<StrengthGrade> {
        match &self.grades {
            GradeSelection::AboveFloor => available.iter().max().copied(),
            GradeSelection::Only(targets) => targets.iter().max().copied(),
        }
    }

    fn targets(&self, grade: StrengthGrade) -> bool {
        match &self.grades {
            GradeSelection::AboveFloor => true,
            GradeSelection::Only(targets) => targets.contains(&grade),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// How a derived slot was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivationRule {
    GradeScaling { from: StrengthGrade, ratio: f64 },
    SizeExtrapolation { reference: SectionSize, factor: f64 },
}

/// One entry written by a derivation pass
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSlot {
    pub grade: StrengthGrade,
    pub size: SectionSize,
    pub condition: ConditionKey,
    pub rule: DerivationRule,
    pub reference_value: f64,
    pub value: f64,
}

/// A slot left empty because no lower grade exists to scale from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreachableSlot {
    pub grade: StrengthGrade,
    pub size: SectionSize,
    pub condition: ConditionKey,
}

/// Outcome of one `derive_missing` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationSummary {
    pub element: String,
    pub derived: Vec<DerivedSlot>,
    pub unreachable: Vec<UnreachableSlot>,
}

impl DerivationSummary {
    fn new(element: &str) -> Self {
        DerivationSummary {
            element: element.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }
}

/// Outcome of a whole-database pass
#[derive(Debug, Default)]
pub struct DatabaseDerivation {
    pub summaries: BTreeMap<String, DerivationSummary>,
    pub failures: BTreeMap<String, SpanError>,
}

impl DatabaseDerivation {
    pub fn derived_count(&self) -> usize {
        self.summaries.values().map(|s| s.derived.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Applies grade ratios and size rules to grade tables
#[derive(Debug, Clone)]
pub struct DerivationEngine {
    ratios: GradeRatios,
    grades: Vec<StrengthGrade>,
}

impl Default for DerivationEngine {
    fn default() -> Self {
        DerivationEngine::new(&EngineConfig::default())
    }
}

impl DerivationEngine {
    pub fn new(config: &EngineConfig) -> Self {
        DerivationEngine {
            ratios: config.grade_ratios.clone(),
            grades: config.grades_available.clone(),
        }
    }

    pub fn ratios(&self) -> &GradeRatios {
        &self.ratios
    }

    /// Fill every slot the request asks for.
    ///
    /// On error the element keeps whatever was written before the failure;
    /// a rerun with a corrected request picks up from there.
    pub fn derive_missing(
        &self,
        element: &mut StructuralElement,
        request: &DerivationRequest,
    ) -> SpanResult<DerivationSummary> {
        for rule in &request.size_rules {
            rule.validate()?;
            let tabulated = element.grade_table.iter().any(|(_, size, _, _)| size == rule.reference);
            if !tabulated {
                return Err(SpanError::missing_reference(
                    &element.name,
                    "any",
                    rule.target.to_string(),
                    "any",
                    format!("reference section {}", rule.reference),
                ));
            }
        }
        if let GradeSelection::Only(targets) = &request.grades {
            for target in targets {
                if !self.grades.contains(target) {
                    return Err(SpanError::unknown_key("grade", target.code()));
                }
                if !element.grade_table.grades().any(|g| g <= *target) {
                    return Err(SpanError::missing_reference(
                        &element.name,
                        target.code(),
                        "any",
                        "any",
                        missing_grades_below(*target),
                    ));
                }
            }
        }

        let mut summary = DerivationSummary::new(&element.name);
        let Some(top) = request.top_grade(&self.grades) else {
            return Ok(summary);
        };

        for grade in self.grades.iter().copied().filter(|g| *g <= top) {
            self.scale_grade(element, grade, request, &mut summary)?;
            for rule in &request.size_rules {
                self.extrapolate_size(element, grade, rule, &mut summary)?;
            }
        }

        info!(
            element = %element.name,
            derived = summary.derived.len(),
            unreachable = summary.unreachable.len(),
            "derivation pass complete"
        );
        Ok(summary)
    }

    /// Convenience: derive one explicit grade with no size rules
    pub fn derive_grade(&self, element: &mut StructuralElement, grade: StrengthGrade) -> SpanResult<DerivationSummary> {
        self.derive_missing(element, &DerivationRequest::grade(grade))
    }

    /// Derive one (grade, size, condition) slot, chaining through any
    /// intermediate grade. Returns the value now stored at the slot.
    pub fn derive_entry(
        &self,
        element: &mut StructuralElement,
        grade: StrengthGrade,
        size: SectionSize,
        condition: &ConditionKey,
    ) -> SpanResult<f64> {
        if let Some(existing) = element.grade_table.get(grade, size, condition) {
            return Ok(existing.value());
        }
        if !self.grades.contains(&grade) {
            return Err(SpanError::unknown_key("grade", grade.code()));
        }

        let start = StrengthGrade::ALL
            .iter()
            .rev()
            .copied()
            .filter(|g| *g < grade)
            .find(|g| element.grade_table.contains(*g, size, condition))
            .ok_or_else(|| {
                SpanError::missing_reference(
                    &element.name,
                    grade.code(),
                    size.to_string(),
                    condition.to_string(),
                    missing_grades_below(grade),
                )
            })?;

        let mut summary = DerivationSummary::new(&element.name);
        let mut current = start;
        let mut value = element
            .grade_table
            .get(start, size, condition)
            .map(|e| e.value())
            .unwrap_or_default();
        while current < grade {
            let next = current
                .higher()
                .ok_or_else(|| SpanError::config(format!("No grade above {}", current)))?;
            value = self.scale_slot(element, current, next, size, condition, &mut summary)?;
            current = next;
        }
        Ok(value)
    }

    /// Run `derive_missing` over every element in name order.
    ///
    /// Elements without a request get the default one. A failing element is
    /// recorded and the pass moves on. Sections created by size rules are
    /// added to the database's size registry.
    pub fn derive_database(
        &self,
        database: &mut SpanDatabase,
        requests: &BTreeMap<String, DerivationRequest>,
    ) -> DatabaseDerivation {
        let mut outcome = DatabaseDerivation::default();
        let default_request = DerivationRequest::default();

        for (name, element) in database.elements.iter_mut() {
            let request = requests.get(name).unwrap_or(&default_request);
            match self.derive_missing(element, request) {
                Ok(summary) => {
                    outcome.summaries.insert(name.clone(), summary);
                }
                Err(e) => {
                    warn!(element = %name, error = %e, "derivation failed; element left partially derived");
                    outcome.failures.insert(name.clone(), e);
                }
            }
        }

        for summary in outcome.summaries.values() {
            for slot in &summary.derived {
                if let DerivationRule::SizeExtrapolation { .. } = slot.rule {
                    database.timber_specifications.register_size(slot.size);
                }
            }
        }

        info!(
            elements = database.elements.len(),
            derived = outcome.derived_count(),
            failures = outcome.failures.len(),
            "database derivation complete"
        );
        outcome
    }

    /// Grade-scaling step for one grade over every current slot
    fn scale_grade(
        &self,
        element: &mut StructuralElement,
        grade: StrengthGrade,
        request: &DerivationRequest,
        summary: &mut DerivationSummary,
    ) -> SpanResult<()> {
        for (size, condition) in element.grade_table.slots() {
            let table = &element.grade_table;
            if table.contains(grade, size, &condition) || !is_needed(table, grade, size, &condition, request) {
                continue;
            }

            match grade.lower() {
                Some(from) if table.contains(from, size, &condition) => {
                    self.scale_slot(element, from, grade, size, &condition, summary)?;
                }
                _ => {
                    if let GradeSelection::Only(_) = request.grades {
                        if request.targets(grade) {
                            return Err(SpanError::missing_reference(
                                &element.name,
                                grade.code(),
                                size.to_string(),
                                condition.to_string(),
                                missing_grades_below(grade),
                            ));
                        }
                        // Intermediate grade; the listed grade above reports it.
                        continue;
                    }
                    summary.unreachable.push(UnreachableSlot {
                        grade,
                        size,
                        condition,
                    });
                }
            }
        }
        Ok(())
    }

    /// Scale one slot from `from` to the adjacent grade `to`
    fn scale_slot(
        &self,
        element: &mut StructuralElement,
        from: StrengthGrade,
        to: StrengthGrade,
        size: SectionSize,
        condition: &ConditionKey,
        summary: &mut DerivationSummary,
    ) -> SpanResult<f64> {
        let ratio = self.ratios.step(from, to)?;
        let reference_value = element
            .grade_table
            .get(from, size, condition)
            .map(|e| e.value())
            .ok_or_else(|| {
                SpanError::missing_reference(
                    &element.name,
                    to.code(),
                    size.to_string(),
                    condition.to_string(),
                    missing_grades_below(to),
                )
            })?;
        if let Some(existing) = element.grade_table.get(to, size, condition) {
            return Ok(existing.value());
        }

        let value = self.ratios.round(reference_value * ratio);
        let provenance = Provenance::derived(
            format!("calculated_from_{}", from.tag()),
            format!("{} derived from {} using ratio {}", to, from, ratio),
        );
        element
            .grade_table
            .insert_if_absent(to, size, condition.clone(), SpanEntry::new(value, provenance)?);
        debug!(
            element = %element.name,
            grade = %to,
            size = %size,
            condition = %condition,
            reference = reference_value,
            value,
            "grade-scaled"
        );
        summary.derived.push(DerivedSlot {
            grade: to,
            size,
            condition: condition.clone(),
            rule: DerivationRule::GradeScaling { from, ratio },
            reference_value,
            value,
        });
        Ok(value)
    }

    /// Size-extrapolation step for one rule at one grade
    fn extrapolate_size(
        &self,
        element: &mut StructuralElement,
        grade: StrengthGrade,
        rule: &SizeExtrapolation,
        summary: &mut DerivationSummary,
    ) -> SpanResult<()> {
        let table = &mut element.grade_table;
        let references: Vec<(ConditionKey, f64)> = match table
            .sizes_for(grade)
            .and_then(|sizes| sizes.get(&rule.reference))
        {
            Some(conditions) => conditions.iter().map(|(c, e)| (c.clone(), e.value())).collect(),
            None => return Ok(()),
        };

        for (condition, reference_value) in references {
            if table.contains(grade, rule.target, &condition) {
                continue;
            }
            let value = self.ratios.round(reference_value * rule.factor);
            rule.check_result(reference_value, value)?;

            let note = if rule.note.is_empty() {
                format!("{} extrapolated from {} using factor {}", rule.target, rule.reference, rule.factor)
            } else {
                format!(
                    "{} extrapolated from {} using factor {} ({})",
                    rule.target, rule.reference, rule.factor, rule.note
                )
            };
            let entry = SpanEntry::new(value, Provenance::derived(rule.method_tag(), note))?;

            if table.insert_if_absent(grade, rule.target, condition.clone(), entry) {
                debug!(
                    element = %element.name,
                    grade = %grade,
                    size = %rule.target,
                    condition = %condition,
                    reference = reference_value,
                    value,
                    "size-extrapolated"
                );
                summary.derived.push(DerivedSlot {
                    grade,
                    size: rule.target,
                    condition,
                    rule: DerivationRule::SizeExtrapolation {
                        reference: rule.reference,
                        factor: rule.factor,
                    },
                    reference_value,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Whether an absent slot at `grade` should be filled for this request
fn is_needed(
    table: &GradeTable,
    grade: StrengthGrade,
    size: SectionSize,
    condition: &ConditionKey,
    request: &DerivationRequest,
) -> bool {
    match &request.grades {
        GradeSelection::AboveFloor => true,
        GradeSelection::Only(targets) => targets
            .iter()
            .any(|t| *t >= grade && !table.contains(*t, size, condition)),
    }
}

fn missing_grades_below(grade: StrengthGrade) -> String {
    let below: Vec<&str> = StrengthGrade::ALL
        .iter()
        .filter(|g| **g < grade)
        .rev()
        .map(|g| g.code())
        .collect();
    if below.is_empty() {
        format!("{} is the lowest grade and cannot be derived", grade)
    } else {
        format!("an entry at {}", below.join(" or "))
    }
}

/// Derive with the default rule table
pub fn derive_missing(element: &mut StructuralElement, request: &DerivationRequest) -> SpanResult<DerivationSummary> {
    DerivationEngine::default().derive_missing(element, request)
}

/// Derive one grade with the default rule table
pub fn derive_grade(element: &mut StructuralElement, grade: StrengthGrade) -> SpanResult<DerivationSummary> {
    DerivationEngine::default().derive_grade(element, grade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{names, DeflectionLimit, DesignCriteria, LoadAssumption, Loading, Measure};
    use crate::ratios::{round_span, RAFTER_100_FROM_150, WIDTH_63_FROM_47};
    use crate::tables::ConfidenceLevel;
    use crate::timber::Spacing;

    const S47X100: SectionSize = SectionSize::new(47, 100);
    const S47X150: SectionSize = SectionSize::new(47, 150);
    const S47X225: SectionSize = SectionSize::new(47, 225);
    const S63X150: SectionSize = SectionSize::new(63, 150);

    fn entry(value: f64) -> SpanEntry {
        SpanEntry::sourced(value, ["trada_typical", "engineering_practice"], "").unwrap()
    }

    fn joists() -> StructuralElement {
        StructuralElement::new(
            names::FLOOR_JOISTS,
            "Floor joists",
            Loading::Uniform(LoadAssumption::new(0.25, 1.5, 1.75)),
            DesignCriteria::new(DeflectionLimit::span(333), "simply_supported"),
        )
    }

    fn seeded_joists() -> StructuralElement {
        let mut element = joists();
        let t = &mut element.grade_table;
        t.insert(StrengthGrade::C16, S47X100, Spacing::S400.into(), entry(2.15));
        t.insert(StrengthGrade::C16, S47X100, Spacing::S600.into(), entry(1.82));
        t.insert(StrengthGrade::C16, S47X225, Spacing::S400.into(), entry(4.93));
        element
    }

    fn value(element: &StructuralElement, grade: StrengthGrade, size: SectionSize, cond: ConditionKey) -> f64 {
        element.grade_table.get(grade, size, &cond).unwrap().value()
    }

    #[test]
    fn test_grade_scaling_c16_to_c24() {
        let mut element = seeded_joists();
        derive_grade(&mut element, StrengthGrade::C24).unwrap();

        let c24 = value(&element, StrengthGrade::C24, S47X100, Spacing::S400.into());
        assert_eq!(c24, round_span(2.15 * 1.09, 2));
        assert_eq!(c24, 2.34);

        let derived = element
            .grade_table
            .get(StrengthGrade::C24, S47X100, &Spacing::S400.into())
            .unwrap();
        assert_eq!(derived.confidence(), ConfidenceLevel::Medium);
        assert!(derived.provenance().source_tags.contains("calculated_from_c16"));
        assert!(!element.grade_table.contains(StrengthGrade::C30, S47X100, &Spacing::S400.into()));
    }

    #[test]
    fn test_chained_rounding_to_c30() {
        let mut element = seeded_joists();
        derive_grade(&mut element, StrengthGrade::C30).unwrap();

        assert_eq!(value(&element, StrengthGrade::C24, S47X225, Spacing::S400.into()), 5.37);
        assert_eq!(value(&element, StrengthGrade::C30, S47X225, Spacing::S400.into()), 5.69);

        let c30 = element
            .grade_table
            .get(StrengthGrade::C30, S47X225, &Spacing::S400.into())
            .unwrap();
        assert!(c30.provenance().source_tags.contains("calculated_from_c24"));
    }

    #[test]
    fn test_default_request_fills_all_grades() {
        let mut element = seeded_joists();
        let summary = derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        // 3 slots x 2 grades
        assert_eq!(summary.derived.len(), 6);
        assert!(summary.unreachable.is_empty());
        assert_eq!(element.grade_table.entry_count(), 9);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut element = seeded_joists();
        derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        let after_first = element.clone();

        let second = derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        assert!(second.is_empty());
        assert_eq!(element, after_first);
    }

    #[test]
    fn test_never_overwrites_existing_entries() {
        let mut element = seeded_joists();
        element
            .grade_table
            .insert(StrengthGrade::C24, S47X100, Spacing::S400.into(), entry(2.40));

        derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        assert_eq!(value(&element, StrengthGrade::C24, S47X100, Spacing::S400.into()), 2.40);
        // C30 scales from the tabulated C24, not a recomputed one
        assert_eq!(value(&element, StrengthGrade::C30, S47X100, Spacing::S400.into()), 2.54);
    }

    #[test]
    fn test_missing_reference_for_explicit_grade() {
        // Neither C16 nor C24 is tabulated
        let mut element = joists();
        let err = derive_grade(&mut element, StrengthGrade::C30).unwrap_err();
        match err {
            SpanError::MissingReference { element, grade, needed, .. } => {
                assert_eq!(element, names::FLOOR_JOISTS);
                assert_eq!(grade, "C30");
                assert!(needed.contains("C24 or C16"));
            }
            other => panic!("expected MissingReference, got {:?}", other),
        }
        assert!(element.grade_table.is_empty());
    }

    #[test]
    fn test_missing_reference_names_slot() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X100, Spacing::S400.into(), entry(2.15));
        element
            .grade_table
            .insert(StrengthGrade::C30, S47X150, Spacing::S400.into(), entry(3.9));

        let request = DerivationRequest {
            grades: GradeSelection::Only(vec![StrengthGrade::C24, StrengthGrade::C30]),
            size_rules: Vec::new(),
        };
        let err = derive_missing(&mut element, &request).unwrap_err();
        match err {
            SpanError::MissingReference {
                grade, size, condition, ..
            } => {
                assert_eq!(grade, "C24");
                assert_eq!(size, "47x150");
                assert_eq!(condition, "400mm");
            }
            other => panic!("expected MissingReference, got {:?}", other),
        }
        // The reachable slot was filled before the failure
        assert_eq!(value(&element, StrengthGrade::C24, S47X100, Spacing::S400.into()), 2.34);
    }

    #[test]
    fn test_missing_reference_with_only_higher_grade() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C30, S47X150, Spacing::S400.into(), entry(3.9));

        let err = derive_grade(&mut element, StrengthGrade::C24).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_REFERENCE");
        assert!(err.is_branch_local());
        assert!(!element.grade_table.contains(StrengthGrade::C24, S47X150, &Spacing::S400.into()));
    }

    #[test]
    fn test_derive_entry_chains_one_slot() {
        let mut element = seeded_joists();
        let engine = DerivationEngine::default();
        let c30 = engine
            .derive_entry(&mut element, StrengthGrade::C30, S47X225, &Spacing::S400.into())
            .unwrap();
        assert_eq!(c30, 5.69);
        assert_eq!(value(&element, StrengthGrade::C24, S47X225, Spacing::S400.into()), 5.37);
        // Other slots untouched
        assert!(!element.grade_table.contains(StrengthGrade::C24, S47X100, &Spacing::S400.into()));
    }

    #[test]
    fn test_derive_entry_without_lower_grades() {
        // 47x150 @ 400mm has neither C16 nor C24
        let mut element = seeded_joists();
        let before = element.clone();
        let err = DerivationEngine::default()
            .derive_entry(&mut element, StrengthGrade::C30, S47X150, &Spacing::S400.into())
            .unwrap_err();
        match err {
            SpanError::MissingReference {
                element: name,
                grade,
                size,
                condition,
                needed,
            } => {
                assert_eq!(name, names::FLOOR_JOISTS);
                assert_eq!(grade, "C30");
                assert_eq!(size, "47x150");
                assert_eq!(condition, "400mm");
                assert_eq!(needed, "an entry at C24 or C16");
            }
            other => panic!("expected MissingReference, got {:?}", other),
        }
        assert_eq!(element, before);
    }

    #[test]
    fn test_above_floor_skips_slots_without_lower_grade() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C24, S47X150, Spacing::S400.into(), entry(3.5));

        let summary = derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        assert_eq!(summary.derived.len(), 1);
        assert_eq!(summary.derived[0].grade, StrengthGrade::C30);
        assert_eq!(
            summary.unreachable,
            vec![UnreachableSlot {
                grade: StrengthGrade::C16,
                size: S47X150,
                condition: Spacing::S400.into(),
            }]
        );
    }

    #[test]
    fn test_size_rule_then_grade_scaling() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S400.into(), entry(3.28));

        let request = DerivationRequest::default().with_size_rule(SizeExtrapolation::new(
            S63X150,
            S47X150,
            WIDTH_63_FROM_47,
            "wider section",
        ));
        let summary = derive_missing(&mut element, &request).unwrap();

        let c16 = element
            .grade_table
            .get(StrengthGrade::C16, S63X150, &Spacing::S400.into())
            .unwrap();
        assert_eq!(c16.value(), round_span(3.28 * 1.05, 2));
        assert!(c16.provenance().source_tags.contains("calculated_from_47x150"));
        assert!(c16.provenance().note.contains("1.05"));

        // The new section is grade-scaled from its own C16 entry
        let c24 = value(&element, StrengthGrade::C24, S63X150, Spacing::S400.into());
        assert_eq!(c24, round_span(c16.value() * 1.09, 2));

        // 47x150 at C24, C30 and 63x150 at C16, C24, C30
        assert_eq!(summary.derived.len(), 5);
    }

    #[test]
    fn test_size_rule_smaller_section() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S400.into(), entry(2.9));

        let request = DerivationRequest::default().with_size_rule(SizeExtrapolation::new(
            S47X100,
            S47X150,
            RAFTER_100_FROM_150,
            "",
        ));
        derive_missing(&mut element, &request).unwrap();
        let smaller = value(&element, StrengthGrade::C16, S47X100, Spacing::S400.into());
        assert_eq!(smaller, 2.09);
        assert!(smaller < 2.9);
    }

    #[test]
    fn test_size_rule_rejects_wrong_side_factor() {
        let larger_with_shrink = SizeExtrapolation::new(S47X225, S47X150, 0.9, "");
        assert!(larger_with_shrink.validate().is_err());

        let smaller_with_growth = SizeExtrapolation::new(S47X100, S47X150, 1.2, "");
        assert!(smaller_with_growth.validate().is_err());

        let same = SizeExtrapolation::new(S47X150, S47X150, 1.1, "");
        assert!(same.validate().is_err());

        assert!(SizeExtrapolation::new(S47X225, S47X150, 1.15, "").validate().is_ok());
    }

    #[test]
    fn test_size_rule_result_must_move_away_from_reference() {
        let mut element = joists();
        element
            .grade_table
            .insert(StrengthGrade::C16, S47X150, Spacing::S400.into(), entry(0.5));

        // 0.5 x 1.001 rounds back to 0.5
        let request =
            DerivationRequest::default().with_size_rule(SizeExtrapolation::new(S47X225, S47X150, 1.001, ""));
        let err = derive_missing(&mut element, &request).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_size_rule_needs_tabulated_reference() {
        let mut element = seeded_joists();
        let request =
            DerivationRequest::default().with_size_rule(SizeExtrapolation::new(S63X150, S47X150, 1.05, ""));
        let err = derive_missing(&mut element, &request).unwrap_err();
        assert!(matches!(err, SpanError::MissingReference { .. }));
    }

    #[test]
    fn test_scenario_at_spacing_keys() {
        let mut walls = StructuralElement::new(
            names::STUD_WALLS,
            "Stud walls",
            Loading::Uniform(LoadAssumption::new(0.5, 1.5, 2.0)),
            DesignCriteria::new(DeflectionLimit::height(300), "pinned_both_ends"),
        )
        .with_measure(Measure::Height);
        let size = SectionSize::new(38, 89);
        let key = ConditionKey::scenario_at("partition_wall", Spacing::S600);
        walls.grade_table.insert(StrengthGrade::C16, size, key.clone(), entry(2.8));

        derive_missing(&mut walls, &DerivationRequest::default()).unwrap();
        assert_eq!(value(&walls, StrengthGrade::C24, size, key.clone()), 3.05);
        assert_eq!(value(&walls, StrengthGrade::C30, size, key), 3.23);
    }

    #[test]
    fn test_unknown_grade_in_request() {
        let mut config = EngineConfig::default();
        config.grades_available = vec![StrengthGrade::C16, StrengthGrade::C24];
        let engine = DerivationEngine::new(&config);

        let mut element = seeded_joists();
        let err = engine.derive_grade(&mut element, StrengthGrade::C30).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_KEY");

        // Default request stops at the highest configured grade
        engine.derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        assert!(element.grade_table.sizes_for(StrengthGrade::C30).is_none());
    }

    #[test]
    fn test_only_configured_grades_are_written() {
        // Built directly, skipping the adjacency check in EngineConfig::validate
        let mut config = EngineConfig::default();
        config.grades_available = vec![StrengthGrade::C16, StrengthGrade::C30];
        let engine = DerivationEngine::new(&config);

        let mut element = seeded_joists();
        let summary = engine.derive_missing(&mut element, &DerivationRequest::default()).unwrap();
        assert!(summary.derived.is_empty());
        assert!(element.grade_table.sizes_for(StrengthGrade::C24).is_none());
        assert!(element.grade_table.sizes_for(StrengthGrade::C30).is_none());
        assert_eq!(summary.unreachable.len(), 3);
    }

    #[test]
    fn test_derive_database_collects_failures() {
        let mut db = SpanDatabase::new("Test Tables");
        db.add_element(seeded_joists());

        let mut rafters = joists();
        rafters.name = names::ROOF_RAFTERS.to_string();
        rafters
            .grade_table
            .insert(StrengthGrade::C30, S47X150, Spacing::S400.into(), entry(3.9));
        db.add_element(rafters);

        let mut requests = BTreeMap::new();
        requests.insert(names::ROOF_RAFTERS.to_string(), DerivationRequest::grade(StrengthGrade::C24));

        let outcome = DerivationEngine::default().derive_database(&mut db, &requests);
        assert!(!outcome.is_complete());
        assert!(outcome.failures.contains_key(names::ROOF_RAFTERS));
        assert_eq!(outcome.summaries[names::FLOOR_JOISTS].derived.len(), 6);
        assert_eq!(db.element(names::FLOOR_JOISTS).unwrap().grade_table.entry_count(), 9);
    }
}
