use rust_decimal::Decimal;
use tracing::debug;

use crate::grading::average::{component_average, weighted_average};
use crate::grading::credits::settle_unit_credits;
use crate::grading::parser::parse_grade_cell;
use crate::grading::{
    EvaluationPolicy, SubjectResult, SubjectState, UnitResult, Verdict, COMPENSATION_FLOOR,
    PASS_MARK,
};

/// One subject position as seen by a unit: its raw cell and configured credit.
#[derive(Debug, Clone, Copy)]
pub struct SubjectInput<'a> {
    pub position: usize,
    pub raw: &'a str,
    pub credit: Option<Decimal>,
    pub hidden: bool,
}

pub fn evaluate_subject(input: &SubjectInput<'_>) -> SubjectResult {
    let mut result = SubjectResult {
        position: input.position,
        raw_cell: input.raw.to_string(),
        components: Vec::new(),
        special: None,
        average: None,
        credit_weight: None,
        effective_credit: None,
        state: SubjectState::Unset,
        hidden: input.hidden,
    };
    if input.hidden {
        return result;
    }

    let parsed = parse_grade_cell(input.raw);
    if let Some(special) = parsed.special {
        result.special = Some(special);
        return result;
    }
    if parsed.components.is_empty() {
        return result;
    }

    result.average = Some(component_average(&parsed.components));
    result.components = parsed.components;
    match input.credit {
        Some(credit) => {
            result.credit_weight = Some(credit);
            result.effective_credit = Some(credit);
        }
        None => debug!(
            position = input.position,
            "subject has no credit weight, left ungraded"
        ),
    }
    result
}

/// Evaluates every subject of a unit, assigns states under `policy` and
/// settles the unit's credits.
pub fn evaluate_unit(
    name: &str,
    policy: EvaluationPolicy,
    inputs: &[SubjectInput<'_>],
) -> UnitResult {
    let mut subjects: Vec<SubjectResult> = inputs.iter().map(evaluate_subject).collect();

    let collected: Vec<(usize, Decimal, Decimal)> = subjects
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| Some((idx, s.average?, s.credit_weight?)))
        .collect();

    if collected.is_empty() {
        debug!(unit = name, "no gradable subject, unit not validated");
        return UnitResult {
            name: name.to_string(),
            policy,
            subjects,
            average: None,
            credit_total: Decimal::ZERO,
            state: Verdict::NotValidated,
        };
    }

    let average = weighted_average(collected.iter().map(|(_, avg, credit)| (*avg, *credit)));
    let averages: Vec<Decimal> = collected.iter().map(|(_, avg, _)| *avg).collect();
    let (state, subject_states) = policy.decide(&averages, average);
    for ((idx, _, _), subject_state) in collected.iter().zip(subject_states) {
        subjects[*idx].state = subject_state;
    }
    debug!(unit = name, %average, %state, %policy, "unit evaluated");

    let mut unit = UnitResult {
        name: name.to_string(),
        policy,
        subjects,
        average: Some(average),
        credit_total: Decimal::ZERO,
        state,
    };
    settle_unit_credits(&mut unit);
    unit
}

impl EvaluationPolicy {
    /// Unit verdict and one state per average, in input order.
    pub fn decide(
        self,
        averages: &[Decimal],
        unit_average: Decimal,
    ) -> (Verdict, Vec<SubjectState>) {
        match self {
            Self::NearPassTolerance => near_pass_tolerance(averages),
            Self::PerSubjectThreshold => per_subject_threshold(averages, unit_average),
        }
    }
}

fn is_near_pass(average: Decimal) -> bool {
    (COMPENSATION_FLOOR..PASS_MARK).contains(&average)
}

fn near_pass_tolerance(averages: &[Decimal]) -> (Verdict, Vec<SubjectState>) {
    let below_floor = averages.iter().filter(|a| **a < COMPENSATION_FLOOR).count();
    let near_pass = averages.iter().filter(|a| is_near_pass(**a)).count();

    if below_floor == 0 && near_pass <= 1 {
        let states = averages
            .iter()
            .map(|a| {
                if is_near_pass(*a) {
                    SubjectState::Compensated
                } else {
                    SubjectState::Unset
                }
            })
            .collect();
        return (Verdict::Validated, states);
    }

    // Failing unit: nothing below the pass mark can be compensated any more.
    let states = averages
        .iter()
        .map(|a| {
            if *a < PASS_MARK {
                SubjectState::Retake
            } else {
                SubjectState::Unset
            }
        })
        .collect();
    (Verdict::NotValidated, states)
}

fn per_subject_threshold(
    averages: &[Decimal],
    unit_average: Decimal,
) -> (Verdict, Vec<SubjectState>) {
    let states = averages
        .iter()
        .map(|a| {
            if *a < COMPENSATION_FLOOR {
                SubjectState::Retake
            } else if *a < PASS_MARK {
                SubjectState::Compensated
            } else {
                SubjectState::Unset
            }
        })
        .collect();
    let verdict = if unit_average >= PASS_MARK {
        Verdict::Validated
    } else {
        Verdict::NotValidated
    };
    (verdict, states)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::grading::SpecialOutcome;

    fn input(position: usize, raw: &str, credit: u32) -> SubjectInput<'_> {
        SubjectInput {
            position,
            raw,
            credit: Some(Decimal::from(credit)),
            hidden: false,
        }
    }

    fn states(unit: &UnitResult) -> Vec<SubjectState> {
        unit.subjects.iter().map(|s| s.state).collect()
    }

    #[test]
    fn all_passing_validates_without_overrides() {
        let inputs = [input(1, "12", 2), input(2, "10", 2), input(3, "15(2)", 2)];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::Validated);
        assert!(states(&unit).iter().all(|s| *s == SubjectState::Unset));
        assert_eq!(unit.credit_total, dec!(6));
    }

    #[test]
    fn single_near_pass_is_compensated() {
        let inputs = [input(1, "9", 2), input(2, "11", 2), input(3, "12", 2)];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::Validated);
        assert_eq!(
            states(&unit),
            vec![
                SubjectState::Compensated,
                SubjectState::Unset,
                SubjectState::Unset
            ]
        );
        assert_eq!(unit.credit_total, dec!(6));
    }

    #[test]
    fn failing_grade_forces_retakes() {
        let inputs = [input(1, "7", 2), input(2, "9", 2), input(3, "12", 2)];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::NotValidated);
        assert_eq!(
            states(&unit),
            vec![SubjectState::Retake, SubjectState::Retake, SubjectState::Unset]
        );
        assert_eq!(unit.credit_total, dec!(2));
    }

    #[test]
    fn two_near_passes_fail_the_unit() {
        let inputs = [input(1, "8", 1), input(2, "9.5", 1), input(3, "14", 1)];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::NotValidated);
        assert_eq!(
            states(&unit),
            vec![SubjectState::Retake, SubjectState::Retake, SubjectState::Unset]
        );
    }

    #[test]
    fn per_subject_policy_judges_each_subject() {
        let inputs = [input(1, "7", 1), input(2, "9", 1), input(3, "16", 2)];
        let unit = evaluate_unit("UE4", EvaluationPolicy::PerSubjectThreshold, &inputs);
        assert_eq!(unit.average, Some(dec!(12)));
        assert_eq!(unit.state, Verdict::Validated);
        assert_eq!(
            states(&unit),
            vec![
                SubjectState::Retake,
                SubjectState::Compensated,
                SubjectState::Unset
            ]
        );
        assert_eq!(unit.credit_total, dec!(3));
    }

    #[test]
    fn per_subject_policy_fails_below_pass_mark() {
        let inputs = [input(1, "9", 1), input(2, "9.5", 1)];
        let unit = evaluate_unit("UE4", EvaluationPolicy::PerSubjectThreshold, &inputs);
        assert_eq!(unit.state, Verdict::NotValidated);
        assert_eq!(
            states(&unit),
            vec![SubjectState::Compensated, SubjectState::Compensated]
        );
    }

    #[test]
    fn unit_average_uses_configured_credit_before_retakes() {
        let inputs = [input(1, "6", 1), input(2, "12", 3)];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.average, Some(dec!(10.5)));
        assert_eq!(unit.credit_total, dec!(3));
    }

    #[test]
    fn hidden_missing_credit_and_special_subjects_are_excluded() {
        let inputs = [
            input(1, "12", 2),
            SubjectInput {
                position: 2,
                raw: "2",
                credit: Some(dec!(2)),
                hidden: true,
            },
            SubjectInput {
                position: 3,
                raw: "3",
                credit: None,
                hidden: false,
            },
            input(4, "Validé ( - ASE)", 2),
        ];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::Validated);
        assert_eq!(unit.average, Some(dec!(12)));
        assert_eq!(unit.credit_total, dec!(2));
        assert_eq!(unit.graded_count(), 1);
        assert_eq!(unit.subjects[3].special, Some(SpecialOutcome::Validated));
        assert_eq!(unit.subjects[3].effective_credit, None);
    }

    #[test]
    fn oversized_cells_do_not_abort_the_unit() {
        let inputs = [
            input(1, "79228162514264337593543950335(2)", 2),
            input(2, "50000000000000000000000000000 - 50000000000000000000000000000", 2),
            input(3, "12", 2),
        ];
        let unit = evaluate_unit("UE1", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.subjects[0].average, None);
        assert_eq!(
            unit.subjects[1].average,
            Some(dec!(50000000000000000000000000000))
        );
        assert_eq!(unit.subjects[2].average, Some(dec!(12)));
        assert_eq!(unit.state, Verdict::Validated);
        assert_eq!(unit.average, Some(dec!(12)));
        assert_eq!(unit.credit_total, dec!(4));
    }

    #[test]
    fn unit_without_scorable_subject_is_not_validated() {
        let inputs = [input(1, "", 2), input(2, "Absent au devoir", 2)];
        let unit = evaluate_unit("UE2", EvaluationPolicy::NearPassTolerance, &inputs);
        assert_eq!(unit.state, Verdict::NotValidated);
        assert_eq!(unit.average, None);
        assert_eq!(unit.credit_total, Decimal::ZERO);
    }
}
