//! Loading / spacing conditions
//!
//! A condition selects one column of a span table. Three shapes occur in
//! practice:
//!
//! - a plain spacing (`"400"`) for joists and rafters,
//! - a named scenario (`"domestic_cut"`) for stair stringers,
//! - a named scenario tabulated at several spacings (`load_bearing_wall`
//!   at 400/600mm) for stud walls.
//!
//! In the span table document the third shape nests one level deeper:
//!
//! ```json
//! { "load_bearing_wall": { "400": { "max_height": 2.0, ... }, "600": { ... } } }
//! ```

use std::collections::BTreeMap;

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{SpanError, SpanResult};
use crate::tables::entry::SpanEntry;
use crate::timber::Spacing;

/// Key of one column in a span table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionKey {
    Spacing(Spacing),
    Scenario(String),
    ScenarioAtSpacing { scenario: String, spacing: Spacing },
}

/// Which shape of condition key an element uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    Spacing,
    Scenario,
    ScenarioAtSpacing,
}

impl ConditionKey {
    pub fn scenario_at(scenario: impl Into<String>, spacing: Spacing) -> Self {
        ConditionKey::ScenarioAtSpacing {
            scenario: scenario.into(),
            spacing,
        }
    }

    /// Parse a flat document key: digits are spacings, anything else a scenario.
    pub fn parse(key: &str) -> SpanResult<Self> {
        if Spacing::looks_like_spacing(key) {
            return Ok(ConditionKey::Spacing(Spacing::parse(key)?));
        }
        let scenario = key.trim();
        if scenario.is_empty() {
            return Err(SpanError::invalid_input("condition", key, "Condition key is empty"));
        }
        Ok(ConditionKey::Scenario(scenario.to_string()))
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            ConditionKey::Spacing(_) => ConditionKind::Spacing,
            ConditionKey::Scenario(_) => ConditionKind::Scenario,
            ConditionKey::ScenarioAtSpacing { .. } => ConditionKind::ScenarioAtSpacing,
        }
    }

    pub fn spacing(&self) -> Option<Spacing> {
        match self {
            ConditionKey::Spacing(s) | ConditionKey::ScenarioAtSpacing { spacing: s, .. } => Some(*s),
            ConditionKey::Scenario(_) => None,
        }
    }

    pub fn scenario(&self) -> Option<&str> {
        match self {
            ConditionKey::Scenario(name) | ConditionKey::ScenarioAtSpacing { scenario: name, .. } => Some(name),
            ConditionKey::Spacing(_) => None,
        }
    }
}

impl From<Spacing> for ConditionKey {
    fn from(spacing: Spacing) -> Self {
        ConditionKey::Spacing(spacing)
    }
}

impl std::fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionKey::Spacing(s) => write!(f, "{}", s),
            ConditionKey::Scenario(name) => write!(f, "{}", name),
            ConditionKey::ScenarioAtSpacing { scenario, spacing } => write!(f, "{} @ {}", scenario, spacing),
        }
    }
}

// ============================================================================
// Condition table
// ============================================================================

/// Condition → entry for one (grade, size) cell
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_json::Value>")]
pub struct ConditionTable {
    entries: BTreeMap<ConditionKey, SpanEntry>,
}

impl ConditionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ConditionKey) -> Option<&SpanEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ConditionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert only if the slot is empty. Returns whether the entry was stored.
    pub fn insert_if_absent(&mut self, key: ConditionKey, entry: SpanEntry) -> bool {
        match self.entries.entry(key) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Insert or replace (seed construction only)
    pub fn insert(&mut self, key: ConditionKey, entry: SpanEntry) -> Option<SpanEntry> {
        self.entries.insert(key, entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConditionKey, &SpanEntry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConditionKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ConditionKey, SpanEntry)> for ConditionTable {
    fn from_iter<T: IntoIterator<Item = (ConditionKey, SpanEntry)>>(iter: T) -> Self {
        ConditionTable {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Document form
// ============================================================================

/// One document value: a flat entry or spacing → entry under a scenario
#[derive(Serialize)]
#[serde(untagged)]
enum RawCondition<'a> {
    Entry(&'a SpanEntry),
    BySpacing(BTreeMap<Spacing, &'a SpanEntry>),
}

/// An object keyed only by spacings, with no span field of its own, is a
/// nested spacing table
fn is_nested(fields: &serde_json::Map<String, serde_json::Value>) -> bool {
    !fields.is_empty()
        && !fields.contains_key("max_span")
        && !fields.contains_key("max_height")
        && fields.keys().all(|k| Spacing::looks_like_spacing(k))
}

fn entry_from_value(key: &str, value: serde_json::Value) -> SpanResult<SpanEntry> {
    serde_json::from_value(value)
        .map_err(|e| SpanError::invalid_input("condition", key, format!("Invalid span entry: {}", e)))
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for ConditionTable {
    type Error = SpanError;

    fn try_from(raw: BTreeMap<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let mut entries = BTreeMap::new();
        for (key, value) in raw {
            let by_spacing = match value {
                serde_json::Value::Object(fields) if is_nested(&fields) => fields,
                other => {
                    let entry = entry_from_value(&key, other)?;
                    entries.insert(ConditionKey::parse(&key)?, entry);
                    continue;
                }
            };
            if Spacing::looks_like_spacing(&key) {
                return Err(SpanError::invalid_input(
                    "condition",
                    key,
                    "Nested spacing tables must be keyed by a scenario name",
                ));
            }
            for (spacing, inner) in by_spacing {
                let entry = entry_from_value(&format!("{} @ {}", key.trim(), spacing), inner)?;
                entries.insert(ConditionKey::scenario_at(key.trim(), Spacing::parse(&spacing)?), entry);
            }
        }
        Ok(ConditionTable { entries })
    }
}

impl ConditionTable {
    /// Group entries into document keys. Fails if two conditions would
    /// write the same key (e.g. `wall` and `wall @ 400mm`).
    fn to_document(&self) -> SpanResult<BTreeMap<String, RawCondition<'_>>> {
        let collision = |key: &ConditionKey, document_key: &str| {
            SpanError::invalid_input(
                "condition",
                key.to_string(),
                format!("Collides with another condition at document key '{}'", document_key),
            )
        };

        let mut raw: BTreeMap<String, RawCondition<'_>> = BTreeMap::new();
        for (key, entry) in &self.entries {
            match key {
                ConditionKey::Spacing(spacing) => {
                    let document_key = String::from(*spacing);
                    if raw.contains_key(&document_key) {
                        return Err(collision(key, &document_key));
                    }
                    raw.insert(document_key, RawCondition::Entry(entry));
                }
                ConditionKey::Scenario(name) => {
                    if raw.contains_key(name) {
                        return Err(collision(key, name));
                    }
                    raw.insert(name.clone(), RawCondition::Entry(entry));
                }
                ConditionKey::ScenarioAtSpacing { scenario, spacing } => {
                    let slot = raw
                        .entry(scenario.clone())
                        .or_insert_with(|| RawCondition::BySpacing(BTreeMap::new()));
                    match slot {
                        RawCondition::BySpacing(by_spacing) => {
                            by_spacing.insert(*spacing, entry);
                        }
                        RawCondition::Entry(_) => return Err(collision(key, scenario)),
                    }
                }
            }
        }
        Ok(raw)
    }
}

impl Serialize for ConditionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().map_err(S::Error::custom)?.serialize(serializer)
    }
}
