use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::ProgramConfig;
use crate::grading::evaluate_cells;
use crate::roster::{StudentReport, StudentRow};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchOptions {
    pub parallel: bool,
    pub skip_incomplete_rows: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            skip_incomplete_rows: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub program: String,
    pub reports: Vec<StudentReport>,
    pub skipped: usize,
}

pub fn evaluate_row(program: &ProgramConfig, row: &StudentRow) -> StudentReport {
    StudentReport {
        student: row.identity.clone(),
        appreciation: row.appreciation.clone(),
        sheet: evaluate_cells(program, &row.cells),
    }
}

/// Evaluates every row independently; output keeps input order.
pub fn evaluate_batch(
    program: &ProgramConfig,
    rows: &[StudentRow],
    options: BatchOptions,
) -> BatchOutcome {
    if program.credits.is_empty() {
        warn!(
            program = %program.key,
            "program has no ECTS credits, every subject stays ungraded"
        );
    }

    let selected: Vec<&StudentRow> = rows
        .iter()
        .filter(|row| {
            let keep = !options.skip_incomplete_rows || row.is_complete();
            if !keep {
                warn!(
                    name = %row.identity.name,
                    code = %row.identity.code,
                    "skipping row without name or learner code"
                );
            }
            keep
        })
        .collect();
    let skipped = rows.len() - selected.len();

    let reports: Vec<StudentReport> = if options.parallel {
        selected
            .par_iter()
            .map(|row| evaluate_row(program, row))
            .collect()
    } else {
        selected
            .iter()
            .map(|row| evaluate_row(program, row))
            .collect()
    };

    info!(
        program = %program.key,
        students = reports.len(),
        skipped,
        "batch evaluated"
    );
    BatchOutcome {
        program: program.key.to_string(),
        reports,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::ProgramCatalog;
    use crate::grading::Verdict;
    use crate::roster::StudentIdentity;

    fn row(name: &str, code: &str, grades: &[&str]) -> StudentRow {
        let mut cells = vec![String::new(); 3];
        cells.extend(grades.iter().map(|g| g.to_string()));
        StudentRow {
            identity: StudentIdentity {
                name: name.to_string(),
                code: code.to_string(),
                ..StudentIdentity::default()
            },
            cells,
            appreciation: None,
        }
    }

    fn program() -> ProgramConfig {
        let mut catalog = ProgramCatalog::builtin().expect("catalog");
        catalog
            .apply_credit_file(r#"{ "BG-TP-2": [ { "ECTS1": 3, "ECTS2": 3 } ] }"#)
            .expect("credits");
        catalog.get("BG_TP_2").expect("BG_TP_2").clone()
    }

    #[test]
    fn parallel_and_sequential_agree_and_keep_order() {
        let program = program();
        let rows: Vec<StudentRow> = (0..40)
            .map(|i| {
                let grade = format!("{}", 6 + (i % 10));
                row(&format!("Student {i}"), &format!("C{i:03}"), &[&grade, "12"])
            })
            .collect();
        let parallel = evaluate_batch(&program, &rows, BatchOptions::default());
        let sequential = evaluate_batch(
            &program,
            &rows,
            BatchOptions {
                parallel: false,
                skip_incomplete_rows: true,
            },
        );
        assert_eq!(parallel.reports, sequential.reports);
        assert_eq!(parallel.reports[7].student.name, "Student 7");
    }

    #[test]
    fn skips_rows_without_identity() {
        let program = program();
        let rows = vec![
            row("Anne", "C1", &["12", "14"]),
            row("", "C2", &["12", "14"]),
            row("Paul", "", &["12", "14"]),
        ];
        let outcome = evaluate_batch(&program, &rows, BatchOptions::default());
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.reports.len(), 1);
        let sheet = &outcome.reports[0].sheet;
        assert_eq!(sheet.overall.state, Some(Verdict::Validated));
        assert_eq!(sheet.overall.credit_total, dec!(6));
        assert_eq!(sheet.overall.average, dec!(13));
    }

    #[test]
    fn can_keep_incomplete_rows() {
        let program = program();
        let rows = vec![row("", "", &["12", "14"])];
        let outcome = evaluate_batch(
            &program,
            &rows,
            BatchOptions {
                parallel: false,
                skip_incomplete_rows: false,
            },
        );
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.reports.len(), 1);
    }
}
