//! Provenance of tabulated values

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};

/// Tag prefixes that mark a value as not taken from a primary source.
pub const NON_PRIMARY_TAG_PREFIXES: [&str; 2] = ["calculated", "estimated"];

/// How much a tabulated value can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Unverified estimate
    Low,
    /// Derived by scaling from another value
    Medium,
    /// Taken directly from an authoritative table
    High,
}

impl ConfidenceLevel {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where a value came from.
///
/// Serialized flat into the owning entry as `confidence`,
/// `source_agreement` and `notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProvenance")]
pub struct Provenance {
    pub confidence: ConfidenceLevel,

    /// Contributing sources or methods; never empty
    #[serde(rename = "source_agreement")]
    pub source_tags: BTreeSet<String>,

    #[serde(rename = "notes", default)]
    pub note: String,
}

#[derive(Deserialize)]
struct RawProvenance {
    confidence: ConfidenceLevel,
    source_agreement: BTreeSet<String>,
    #[serde(default)]
    notes: String,
}

impl TryFrom<RawProvenance> for Provenance {
    type Error = SpanError;

    fn try_from(raw: RawProvenance) -> Result<Self, Self::Error> {
        Provenance::new(raw.confidence, raw.source_agreement, raw.notes)
    }
}

impl Provenance {
    /// Create a provenance record. Fails if no source tag is given.
    pub fn new<I, S>(confidence: ConfidenceLevel, source_tags: I, note: impl Into<String>) -> SpanResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source_tags: BTreeSet<String> = source_tags
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.trim().is_empty())
            .collect();

        if source_tags.is_empty() {
            return Err(SpanError::invalid_input(
                "source_agreement",
                "[]",
                "At least one source tag is required",
            ));
        }

        Ok(Provenance {
            confidence,
            source_tags,
            note: note.into(),
        })
    }

    /// Provenance for a value produced by a derivation rule.
    ///
    /// `method_tag` must itself start with "calculated".
    pub(crate) fn derived(method_tag: String, note: String) -> Self {
        Provenance {
            confidence: ConfidenceLevel::Medium,
            source_tags: BTreeSet::from([method_tag]),
            note,
        }
    }

    /// Whether any tag marks the value as calculated or estimated
    pub fn declares_non_primary(&self) -> bool {
        self.source_tags
            .iter()
            .any(|tag| NON_PRIMARY_TAG_PREFIXES.iter().any(|p| tag.starts_with(p)))
    }

    /// Medium and low confidence values must say how they were obtained
    pub fn is_documented(&self) -> bool {
        self.confidence == ConfidenceLevel::High || self.declares_non_primary()
    }
}
