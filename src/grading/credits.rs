use rust_decimal::Decimal;

use crate::grading::average::checked_total;
use crate::grading::{SubjectState, UnitResult};

/// Zeroes the credit of every retake subject and recomputes the unit total.
/// Safe to call repeatedly.
pub fn settle_unit_credits(unit: &mut UnitResult) {
    for subject in &mut unit.subjects {
        if subject.state == SubjectState::Retake && subject.effective_credit.is_some() {
            subject.effective_credit = Some(Decimal::ZERO);
        }
    }
    unit.credit_total = checked_total(
        unit.subjects
            .iter()
            .filter(|s| s.is_graded())
            .filter_map(|s| s.effective_credit),
    );
}

pub fn overall_credit_total(units: &[UnitResult]) -> Decimal {
    checked_total(units.iter().map(|u| u.credit_total))
}
