//! Span entries

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};
use crate::tables::provenance::{ConfidenceLevel, Provenance};

/// One tabulated span (or height) in metres plus where it came from.
///
/// ## JSON
///
/// ```json
/// {
///   "max_span": 2.15,
///   "confidence": "high",
///   "source_agreement": ["trada_typical", "engineering_practice"],
///   "notes": "Conservative value suitable for most domestic applications"
/// }
/// ```
///
/// `max_height` is accepted in place of `max_span` for stud wall tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpanEntry")]
pub struct SpanEntry {
    /// Span or height in metres (finite, > 0)
    #[serde(rename = "max_span")]
    value: f64,

    #[serde(flatten)]
    provenance: Provenance,
}

#[derive(Deserialize)]
struct RawSpanEntry {
    #[serde(alias = "max_height")]
    max_span: f64,
    confidence: ConfidenceLevel,
    source_agreement: BTreeSet<String>,
    #[serde(default)]
    notes: String,
}

impl TryFrom<RawSpanEntry> for SpanEntry {
    type Error = SpanError;

    fn try_from(raw: RawSpanEntry) -> Result<Self, Self::Error> {
        let provenance = Provenance::new(raw.confidence, raw.source_agreement, raw.notes)?;
        SpanEntry::new(raw.max_span, provenance)
    }
}

impl SpanEntry {
    /// Create an entry, rejecting non-finite or non-positive values.
    pub fn new(value: f64, provenance: Provenance) -> SpanResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(SpanError::invalid_input(
                "max_span",
                value.to_string(),
                "Span must be a finite positive number of metres",
            ));
        }
        Ok(SpanEntry { value, provenance })
    }

    /// Shorthand for a primary-source value
    pub fn sourced<I, S>(value: f64, source_tags: I, note: impl Into<String>) -> SpanResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SpanEntry::new(value, Provenance::new(ConfidenceLevel::High, source_tags, note)?)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.provenance.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_rejects_bad_values() {
        let prov = Provenance::new(ConfidenceLevel::High, ["trada_typical"], "").unwrap();
        assert!(SpanEntry::new(0.0, prov.clone()).is_err());
        assert!(SpanEntry::new(-2.0, prov.clone()).is_err());
        assert!(SpanEntry::new(f64::NAN, prov.clone()).is_err());
        assert!(SpanEntry::new(f64::INFINITY, prov.clone()).is_err());
        assert_eq!(SpanEntry::new(2.15, prov).unwrap().value(), 2.15);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = SpanEntry::sourced(3.2, ["trada_ceiling"], "Light loading allows increased spans").unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["max_span"], 3.2);
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["source_agreement"][0], "trada_ceiling");
        assert_eq!(json["notes"], "Light loading allows increased spans");
    }

    #[test]
    fn test_entry_accepts_max_height() {
        let json = r#"{"max_height": 2.4, "confidence": "high", "source_agreement": ["building_regs"], "notes": "x"}"#;
        let entry: SpanEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.value(), 2.4);
    }

    #[test]
    fn test_deserialize_rejects_zero_span() {
        let json = r#"{"max_span": 0, "confidence": "high", "source_agreement": ["x"]}"#;
        assert!(serde_json::from_str::<SpanEntry>(json).is_err());
    }
}
