use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grading::average::component_average;
use crate::grading::{GradeComponent, ParsedCell, SpecialOutcome};

const VALIDATED_MARKER: &str = "Validé ( - ASE)";
const NOT_VALIDATED_MARKER: &str = "Non Validé ( - ASE)";
const CUSTOM_LABEL_MARKER: &str = "(CCHM)";
const VALIDATED_WORD: &str = "Validé";
const ABSENCE_MARKER: &str = "Absent au devoir";
const PART_SEPARATOR: &str = " - ";
const DEFAULT_COEFFICIENT: &str = "1.0";

/// Turns one raw grade cell into sub-grades or a special outcome.
///
/// Never fails: parts that cannot be read are dropped, so a malformed cell
/// yields fewer components or none at all.
pub fn parse_grade_cell(raw: &str) -> ParsedCell {
    if raw.contains(VALIDATED_MARKER) {
        return ParsedCell::special(SpecialOutcome::Validated);
    }
    if raw.contains(NOT_VALIDATED_MARKER) {
        return ParsedCell::special(SpecialOutcome::NotValidated);
    }
    if raw.contains(CUSTOM_LABEL_MARKER) {
        let label = raw.replace(CUSTOM_LABEL_MARKER, "").trim().to_string();
        return ParsedCell::special(SpecialOutcome::CustomLabel(label));
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(VALIDATED_WORD) {
        return ParsedCell::default();
    }

    let components = trimmed
        .split(PART_SEPARATOR)
        .filter_map(parse_part)
        .collect();
    ParsedCell {
        components,
        special: None,
    }
}

/// A parsed cell together with the average it would contribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellAnalysis {
    pub raw: String,
    #[serde(flatten)]
    pub parsed: ParsedCell,
    pub average: Option<Decimal>,
}

pub fn analyze_cell(raw: &str) -> CellAnalysis {
    let parsed = parse_grade_cell(raw);
    let average = (!parsed.components.is_empty()).then(|| component_average(&parsed.components));
    CellAnalysis {
        raw: raw.to_string(),
        parsed,
        average,
    }
}

fn parse_part(part: &str) -> Option<GradeComponent> {
    let part = part.trim();
    if part.contains(ABSENCE_MARKER) {
        return None;
    }

    let (grade, coefficient) = match part.rsplit_once('(') {
        Some((grade, coefficient)) => (grade, coefficient.trim_end_matches(')')),
        None => (part, DEFAULT_COEFFICIENT),
    };
    let grade = grade.replace(',', ".");
    let grade = grade.trim();
    let coefficient = coefficient.replace(',', ".");
    let coefficient = coefficient.trim();

    let value = if grade.eq_ignore_ascii_case("cchm") {
        Decimal::ONE
    } else {
        if grade.is_empty() {
            return None;
        }
        match parse_decimal(grade) {
            Ok(value) if value.is_zero() => return None,
            Ok(value) => value,
            Err(err) => {
                debug!(part, %err, "dropping unreadable grade");
                return None;
            }
        }
    };

    let coefficient = match parse_decimal(coefficient) {
        Ok(coefficient) if coefficient > Decimal::ZERO => coefficient,
        Ok(_) => return None,
        Err(err) => {
            debug!(part, %err, "dropping unreadable coefficient");
            return None;
        }
    };

    if value.checked_mul(coefficient).is_none() {
        debug!(part, "dropping grade too large to weigh");
        return None;
    }
    Some(GradeComponent::new(value, coefficient))
}

/// Plain decimal first, then exponent notation such as `1e1`.
fn parse_decimal(text: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(text).or_else(|err| Decimal::from_scientific(text).map_err(|_| err))
}
