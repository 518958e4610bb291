pub mod average;
pub mod credits;
pub mod evaluator;
pub mod overall;
pub mod parser;
pub mod unit;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use average::{ceil_hundredths, weighted_average};
pub use evaluator::evaluate_cells;
pub use parser::parse_grade_cell;

/// Lowest average that validates a subject without compensation.
pub const PASS_MARK: Decimal = dec!(10);
/// Lowest average that can still be compensated inside a unit.
pub const COMPENSATION_FLOOR: Decimal = dec!(8);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GradeComponent {
    pub value: Decimal,
    pub coefficient: Decimal,
}

impl GradeComponent {
    pub fn new(value: Decimal, coefficient: Decimal) -> Self {
        Self { value, coefficient }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialOutcome {
    Validated,
    NotValidated,
    CustomLabel(String),
}

impl SpecialOutcome {
    pub fn label(&self) -> &str {
        match self {
            Self::Validated => "Validé",
            Self::NotValidated => "Non Validé",
            Self::CustomLabel(label) => label,
        }
    }
}

impl Display for SpecialOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Either a list of sub-grades or a single special outcome, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedCell {
    pub components: Vec<GradeComponent>,
    pub special: Option<SpecialOutcome>,
}

impl ParsedCell {
    pub fn special(outcome: SpecialOutcome) -> Self {
        Self {
            components: Vec::new(),
            special: Some(outcome),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.special.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubjectState {
    #[default]
    Unset,
    Compensated,
    Retake,
}

impl SubjectState {
    pub fn code(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Compensated => "C",
            Self::Retake => "R",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Validated,
    NotValidated,
}

impl Verdict {
    pub fn code(self) -> &'static str {
        match self {
            Self::Validated => "VA",
            Self::NotValidated => "NV",
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How subject averages inside a unit turn into states and a unit verdict.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationPolicy {
    /// At most one subject in [8, 10) is compensated; anything worse fails the unit.
    #[default]
    NearPassTolerance,
    /// Every subject is judged on its own; the unit passes on its weighted average.
    PerSubjectThreshold,
}

impl EvaluationPolicy {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::NearPassTolerance => "near_pass_tolerance",
            Self::PerSubjectThreshold => "per_subject_threshold",
        }
    }
}

impl Display for EvaluationPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::NearPassTolerance => "near-pass tolerance",
            Self::PerSubjectThreshold => "per-subject threshold",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown evaluation policy: {0}")]
pub struct PolicyParseError(pub String);

impl FromStr for EvaluationPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "near_pass_tolerance" | "tolerance" | "default" => Ok(Self::NearPassTolerance),
            "per_subject_threshold" | "per_subject" | "ue4" => Ok(Self::PerSubjectThreshold),
            _ => Err(PolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectResult {
    pub position: usize,
    pub raw_cell: String,
    pub components: Vec<GradeComponent>,
    pub special: Option<SpecialOutcome>,
    pub average: Option<Decimal>,
    pub credit_weight: Option<Decimal>,
    pub effective_credit: Option<Decimal>,
    pub state: SubjectState,
    pub hidden: bool,
}

impl SubjectResult {
    /// True when the subject has a numeric average and a credit weight, so it
    /// takes part in unit averaging and crediting.
    pub fn is_graded(&self) -> bool {
        self.average.is_some() && self.credit_weight.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitResult {
    pub name: String,
    pub policy: EvaluationPolicy,
    pub subjects: Vec<SubjectResult>,
    pub average: Option<Decimal>,
    pub credit_total: Decimal,
    pub state: Verdict,
}

impl UnitResult {
    pub fn graded_count(&self) -> usize {
        self.subjects.iter().filter(|s| s.is_graded()).count()
    }

    pub fn state_count(&self, state: SubjectState) -> usize {
        self.subjects
            .iter()
            .filter(|s| s.is_graded() && s.state == state)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverallResult {
    pub average: Decimal,
    pub credit_total: Decimal,
    pub state: Option<Verdict>,
}

/// Every computed result for one student row under one program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeSheet {
    pub program: String,
    pub units: Vec<UnitResult>,
    /// Positions that belong to no unit; shown but never credited.
    pub unassigned: Vec<SubjectResult>,
    pub overall: OverallResult,
}

impl GradeSheet {
    pub fn subject(&self, position: usize) -> Option<&SubjectResult> {
        self.units
            .iter()
            .flat_map(|u| u.subjects.iter())
            .chain(self.unassigned.iter())
            .find(|s| s.position == position)
    }

    pub fn unit(&self, name: &str) -> Option<&UnitResult> {
        self.units.iter().find(|u| u.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_aliases() {
        assert_eq!(
            "ue4".parse::<EvaluationPolicy>().expect("alias"),
            EvaluationPolicy::PerSubjectThreshold
        );
        assert_eq!(
            "Near-Pass-Tolerance"
                .parse::<EvaluationPolicy>()
                .expect("slug"),
            EvaluationPolicy::NearPassTolerance
        );
        assert!("lenient".parse::<EvaluationPolicy>().is_err());
    }

    #[test]
    fn renders_state_codes() {
        assert_eq!(SubjectState::Unset.code(), "");
        assert_eq!(SubjectState::Compensated.code(), "C");
        assert_eq!(SubjectState::Retake.code(), "R");
        assert_eq!(Verdict::Validated.to_string(), "VA");
        assert_eq!(Verdict::NotValidated.to_string(), "NV");
    }

    #[test]
    fn special_outcome_labels() {
        assert_eq!(SpecialOutcome::Validated.label(), "Validé");
        assert_eq!(SpecialOutcome::NotValidated.label(), "Non Validé");
        assert_eq!(SpecialOutcome::CustomLabel("12".into()).label(), "12");
    }
}
