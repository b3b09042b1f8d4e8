//! # Span Tables
//!
//! The nested lookup at the heart of the database:
//!
//! ```text
//! GradeTable
//! └── StrengthGrade (C16, C24, C30)
//!     └── SizeTable: SectionSize (47x100, ...)
//!         └── ConditionTable: ConditionKey (400mm, domestic_cut, ...)
//!             └── SpanEntry { value, provenance }
//! ```
//!
//! All levels are `BTreeMap`s so iteration order, and therefore derivation
//! and validation order, is deterministic.
//!
//! ## Example
//!
//! ```rust
//! use span_core::tables::{ConditionKey, GradeTable, SpanEntry};
//! use span_core::timber::{SectionSize, Spacing, StrengthGrade};
//!
//! let mut table = GradeTable::new();
//! let size = SectionSize::new(47, 100);
//! let entry = SpanEntry::sourced(2.15, ["trada_typical"], "").unwrap();
//! table.insert(StrengthGrade::C16, size, Spacing::S400.into(), entry);
//!
//! let found = table.get(StrengthGrade::C16, size, &ConditionKey::Spacing(Spacing::S400));
//! assert_eq!(found.map(|e| e.value()), Some(2.15));
//! ```

pub mod condition;
pub mod entry;
pub mod provenance;

pub use condition::{ConditionKey, ConditionKind, ConditionTable};
pub use entry::SpanEntry;
pub use provenance::{ConfidenceLevel, Provenance, NON_PRIMARY_TAG_PREFIXES};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::timber::{SectionSize, StrengthGrade};

/// Size → conditions for one grade
pub type SizeTable = BTreeMap<SectionSize, ConditionTable>;

/// A (size, condition) pair that may be populated at several grades
pub type Slot = (SectionSize, ConditionKey);

/// Grade → size → condition → entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeTable {
    grades: BTreeMap<StrengthGrade, SizeTable>,
}

impl GradeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, grade: StrengthGrade, size: SectionSize, condition: &ConditionKey) -> Option<&SpanEntry> {
        self.grades.get(&grade)?.get(&size)?.get(condition)
    }

    pub fn contains(&self, grade: StrengthGrade, size: SectionSize, condition: &ConditionKey) -> bool {
        self.get(grade, size, condition).is_some()
    }

    /// Insert or replace an entry (seed construction)
    pub fn insert(
        &mut self,
        grade: StrengthGrade,
        size: SectionSize,
        condition: ConditionKey,
        entry: SpanEntry,
    ) -> Option<SpanEntry> {
        self.grades
            .entry(grade)
            .or_default()
            .entry(size)
            .or_default()
            .insert(condition, entry)
    }

    /// Fill an absent slot; an existing entry is left untouched.
    pub fn insert_if_absent(
        &mut self,
        grade: StrengthGrade,
        size: SectionSize,
        condition: ConditionKey,
        entry: SpanEntry,
    ) -> bool {
        if self.contains(grade, size, &condition) {
            return false;
        }
        self.grades
            .entry(grade)
            .or_default()
            .entry(size)
            .or_default()
            .insert_if_absent(condition, entry)
    }

    /// Grades that hold at least one entry, ascending
    pub fn grades(&self) -> impl Iterator<Item = StrengthGrade> + '_ {
        self.grades
            .iter()
            .filter(|(_, sizes)| sizes.values().any(|c| !c.is_empty()))
            .map(|(g, _)| *g)
    }

    pub fn sizes_for(&self, grade: StrengthGrade) -> Option<&SizeTable> {
        self.grades.get(&grade)
    }

    /// Every (size, condition) populated at any grade, in size then condition order
    pub fn slots(&self) -> BTreeSet<Slot> {
        self.grades
            .values()
            .flat_map(|sizes| {
                sizes
                    .iter()
                    .flat_map(|(size, conditions)| conditions.keys().map(move |c| (*size, c.clone())))
            })
            .collect()
    }

    /// Every populated (grade, size, condition, entry), ascending
    pub fn iter(&self) -> impl Iterator<Item = (StrengthGrade, SectionSize, &ConditionKey, &SpanEntry)> {
        self.grades.iter().flat_map(|(grade, sizes)| {
            sizes.iter().flat_map(move |(size, conditions)| {
                conditions.iter().map(move |(cond, entry)| (*grade, *size, cond, entry))
            })
        })
    }

    /// Number of populated entries
    pub fn entry_count(&self) -> usize {
        self.grades
            .values()
            .flat_map(|sizes| sizes.values())
            .map(ConditionTable::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}
