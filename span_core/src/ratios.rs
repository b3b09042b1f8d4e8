//! # Scaling Ratios
//!
//! The one place where grade ratios and size factors are defined. Every
//! derived span in the database comes from one of these numbers.
//!
//! ## Grade ratios
//!
//! | From | To  | Ratio | Basis                                   |
//! |------|-----|-------|-----------------------------------------|
//! | C16  | C24 | 1.09  | Bending-strength ratio between classes  |
//! | C24  | C30 | 1.06  | Bending-strength ratio between classes  |
//!
//! Ratios are applied between adjacent grades only. C16 → C30 is the product
//! of the two steps (≈ 1.155), but derivation always goes through C24 so
//! each step is rounded on its own.
//!
//! ## Size factors
//!
//! Engineering-judgement factors used to extrapolate a new section from a
//! tabulated neighbour. Factors below 1 derive a smaller section, above 1 a
//! larger one.

use serde::{Deserialize, Serialize};

use crate::errors::{SpanError, SpanResult};
use crate::timber::StrengthGrade;

/// Decimal places kept on every derived span (centimetre precision)
pub const SPAN_DECIMALS: u32 = 2;

/// C16 → C24 span ratio
pub const C16_TO_C24: f64 = 1.09;

/// C24 → C30 span ratio
pub const C24_TO_C30: f64 = 1.06;

/// 63mm-wide joist from the 47mm joist of the same depth
pub const WIDTH_63_FROM_47: f64 = 1.05;

/// 225mm-deep rafter from the 200mm rafter of the same width
pub const RAFTER_225_FROM_200: f64 = 1.15;

/// 100mm-deep rafter from the 150mm rafter of the same width
pub const RAFTER_100_FROM_150: f64 = 0.72;

/// Round a span to the given number of decimal places.
///
/// Rounds the exact binary value, so a product stored as 4.50499... rounds
/// to 4.5 even though it prints as 4.505. Scaling by `10^decimals` first
/// would round such values up.
pub fn round_span(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value).parse().unwrap_or(value)
}

/// Ratio between two adjacent grades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeStep {
    pub from: StrengthGrade,
    pub to: StrengthGrade,
    pub ratio: f64,
}

/// Full rule table: adjacent grade ratios plus rounding precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRatios {
    pub decimals: u32,
    pub steps: Vec<GradeStep>,
}

impl Default for GradeRatios {
    fn default() -> Self {
        GradeRatios {
            decimals: SPAN_DECIMALS,
            steps: vec![
                GradeStep {
                    from: StrengthGrade::C16,
                    to: StrengthGrade::C24,
                    ratio: C16_TO_C24,
                },
                GradeStep {
                    from: StrengthGrade::C24,
                    to: StrengthGrade::C30,
                    ratio: C24_TO_C30,
                },
            ],
        }
    }
}

impl GradeRatios {
    /// Ratio for one adjacent step (`from` must be the grade directly below `to`)
    pub fn step(&self, from: StrengthGrade, to: StrengthGrade) -> SpanResult<f64> {
        self.steps
            .iter()
            .find(|s| s.from == from && s.to == to)
            .map(|s| s.ratio)
            .ok_or_else(|| SpanError::config(format!("No grade ratio defined for {} -> {}", from, to)))
    }

    /// Product of the adjacent steps between two grades.
    ///
    /// Informational: derivation never applies a composed ratio in one go.
    pub fn composed(&self, from: StrengthGrade, to: StrengthGrade) -> SpanResult<f64> {
        if to < from {
            return Err(SpanError::invalid_input(
                "grade",
                format!("{} -> {}", from, to),
                "Spans are only scaled upwards in grade",
            ));
        }
        let mut ratio = 1.0;
        let mut current = from;
        while current < to {
            let next = current
                .higher()
                .ok_or_else(|| SpanError::config(format!("No grade above {}", current)))?;
            ratio *= self.step(current, next)?;
            current = next;
        }
        Ok(ratio)
    }

    /// Check every adjacent pair is present and strengthens the span
    pub fn validate(&self) -> SpanResult<()> {
        for grade in StrengthGrade::ALL {
            if let Some(next) = grade.higher() {
                let ratio = self.step(grade, next)?;
                if !ratio.is_finite() || ratio < 1.0 {
                    return Err(SpanError::config(format!(
                        "Grade ratio {} -> {} must be finite and >= 1.0, got {}",
                        grade, next, ratio
                    )));
                }
            }
        }
        if self.decimals > 6 {
            return Err(SpanError::config(format!("Rounding to {} decimals is not meaningful", self.decimals)));
        }
        Ok(())
    }

    pub fn round(&self, value: f64) -> f64 {
        round_span(value, self.decimals)
    }
}
