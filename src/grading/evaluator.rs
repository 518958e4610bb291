use tracing::debug;

use crate::catalog::ProgramConfig;
use crate::grading::overall::evaluate_overall;
use crate::grading::unit::{evaluate_subject, evaluate_unit, SubjectInput};
use crate::grading::{GradeSheet, SubjectResult, UnitResult};

/// Runs the whole pipeline for one row of raw cells.
pub fn evaluate_cells(program: &ProgramConfig, cells: &[String]) -> GradeSheet {
    let units: Vec<UnitResult> = program
        .units
        .iter()
        .map(|unit| {
            let inputs: Vec<SubjectInput<'_>> = unit
                .subjects
                .iter()
                .map(|position| subject_input(program, cells, *position))
                .collect();
            evaluate_unit(&unit.name, unit.policy, &inputs)
        })
        .collect();

    let assigned = program.unit_positions();
    let unassigned: Vec<SubjectResult> = (1..=program.subject_count())
        .filter(|position| !assigned.contains(position))
        .map(|position| {
            let mut input = subject_input(program, cells, position);
            input.credit = None;
            evaluate_subject(&input)
        })
        .collect();

    let overall = evaluate_overall(&units);
    debug!(
        program = %program.key,
        average = %overall.average,
        credits = %overall.credit_total,
        "grade sheet computed"
    );
    GradeSheet {
        program: program.key.to_string(),
        units,
        unassigned,
        overall,
    }
}

fn subject_input<'a>(
    program: &ProgramConfig,
    cells: &'a [String],
    position: usize,
) -> SubjectInput<'a> {
    SubjectInput {
        position,
        raw: program.cell(cells, position),
        credit: program.credits.weight(position),
        hidden: program.is_hidden(position),
    }
}
