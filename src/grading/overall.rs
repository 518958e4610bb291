use crate::grading::average::{ceil_hundredths, weighted_average};
use crate::grading::credits::overall_credit_total;
use crate::grading::{OverallResult, UnitResult, Verdict};

pub fn evaluate_overall(units: &[UnitResult]) -> OverallResult {
    let raw = weighted_average(
        units
            .iter()
            .filter_map(|u| Some((u.average?, u.credit_total))),
    );
    OverallResult {
        average: ceil_hundredths(raw),
        credit_total: overall_credit_total(units),
        state: overall_state(units.iter().map(|u| u.state)),
    }
}

/// Not validated as soon as one unit is; validated when every unit is; no
/// verdict at all without units.
pub fn overall_state<I>(states: I) -> Option<Verdict>
where
    I: IntoIterator<Item = Verdict>,
{
    let mut seen = false;
    for state in states {
        if state == Verdict::NotValidated {
            return Some(Verdict::NotValidated);
        }
        seen = true;
    }
    seen.then_some(Verdict::Validated)
}
