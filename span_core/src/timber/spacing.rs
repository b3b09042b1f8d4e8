//! Member Spacing (centres)

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};

/// Centre-to-centre spacing of parallel members.
///
/// Serialized as the millimetre value in a string (`"400"`), which is how
/// spacings appear as map keys in the span table document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Spacing {
    /// 300mm centres
    S300,
    /// 400mm centres
    S400,
    /// 450mm centres
    S450,
    /// 600mm centres
    S600,
}

impl Spacing {
    /// All representable spacings, narrowest first
    pub const ALL: [Spacing; 4] = [Spacing::S300, Spacing::S400, Spacing::S450, Spacing::S600];

    /// Spacing in millimetres
    pub fn mm(&self) -> u16 {
        match self {
            Spacing::S300 => 300,
            Spacing::S400 => 400,
            Spacing::S450 => 450,
            Spacing::S600 => 600,
        }
    }

    pub fn from_mm(mm: u16) -> SpanResult<Self> {
        match mm {
            300 => Ok(Spacing::S300),
            400 => Ok(Spacing::S400),
            450 => Ok(Spacing::S450),
            600 => Ok(Spacing::S600),
            _ => Err(SpanError::unknown_key("spacing", mm.to_string())),
        }
    }

    /// Parse "400", "400mm" or "400 mm"
    pub fn parse(s: &str) -> SpanResult<Self> {
        let digits = s.trim().trim_end_matches("mm").trim();
        let mm: u16 = digits
            .parse()
            .map_err(|_| SpanError::unknown_key("spacing", s))?;
        Self::from_mm(mm)
    }

    /// Whether a condition key string looks like a spacing
    pub fn looks_like_spacing(s: &str) -> bool {
        let digits = s.trim().trim_end_matches("mm").trim();
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    }
}

impl FromStr for Spacing {
    type Err = SpanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Spacing {
    type Error = SpanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Spacing> for String {
    fn from(spacing: Spacing) -> Self {
        spacing.mm().to_string()
    }
}

impl std::fmt::Display for Spacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}mm", self.mm())
    }
}
