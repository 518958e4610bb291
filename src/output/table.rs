use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::catalog::ProgramConfig;
use crate::grading::parser::CellAnalysis;
use crate::grading::{ceil_hundredths, SubjectResult, Verdict};
use crate::roster::StudentReport;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn verdict_cell(verdict: Option<Verdict>) -> Cell {
    match verdict {
        Some(Verdict::Validated) => Cell::new("VA").fg(Color::Green),
        Some(Verdict::NotValidated) => Cell::new("NV").fg(Color::Red),
        None => Cell::new("-"),
    }
}

pub fn render_reports_table(reports: &[StudentReport]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Student",
        "Code",
        "Average",
        "ECTS",
        "Result",
        "Units",
    ]);
    for report in reports {
        let sheet = &report.sheet;
        let units = sheet
            .units
            .iter()
            .map(|u| format!("{} {}", u.name, u.state))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(Row::from(vec![
            Cell::new(&report.student.name),
            Cell::new(&report.student.code),
            Cell::new(format!("{:.2}", sheet.overall.average)),
            Cell::new(sheet.overall.credit_total.normalize()),
            verdict_cell(sheet.overall.state),
            Cell::new(units),
        ]));
    }
    table.to_string()
}

pub fn render_units_table(report: &StudentReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Unit", "Policy", "Average", "ECTS", "Result", "Subjects"]);
    for unit in &report.sheet.units {
        let subjects = unit
            .subjects
            .iter()
            .filter(|s| !s.hidden)
            .map(subject_summary)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(Row::from(vec![
            Cell::new(&unit.name),
            Cell::new(unit.policy),
            Cell::new(
                unit.average
                    .map(|a| format!("{:.2}", ceil_hundredths(a)))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(unit.credit_total.normalize()),
            verdict_cell(Some(unit.state)),
            Cell::new(subjects),
        ]));
    }
    format!("{} ({})\n{table}", report.student.name, report.student.code)
}

fn subject_summary(subject: &SubjectResult) -> String {
    let value = match (&subject.special, subject.average) {
        (Some(special), _) => special.label().to_string(),
        (None, Some(avg)) if subject.is_graded() => format!("{avg:.2}"),
        (None, Some(avg)) => format!("{avg:.2}?"),
        (None, None) => "-".to_string(),
    };
    let state = subject.state.code();
    if state.is_empty() || !subject.is_graded() {
        format!("#{} {value}", subject.position)
    } else {
        format!("#{} {value} {state}", subject.position)
    }
}

pub fn render_programs_table<'a, I>(programs: I) -> String
where
    I: IntoIterator<Item = &'a ProgramConfig>,
{
    let mut table = new_table();
    table.set_header(vec![
        "Program",
        "Template",
        "Subjects",
        "Units",
        "Hidden",
        "ECTS entries",
    ]);
    for program in programs {
        let units = program
            .units
            .iter()
            .map(|u| format!("{} [{}] {}", u.name, u.subjects.len(), u.policy.as_slug()))
            .collect::<Vec<_>>()
            .join("\n");
        let hidden = program
            .hidden
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let credits = if program.credits.is_empty() {
            Cell::new("none").fg(Color::Yellow)
        } else {
            Cell::new(program.credits.len())
        };
        table.add_row(Row::from(vec![
            Cell::new(&program.key),
            Cell::new(program.template.as_deref().unwrap_or("-")),
            Cell::new(program.subject_count()),
            Cell::new(units),
            Cell::new(hidden),
            credits,
        ]));
    }
    table.to_string()
}

pub fn render_cell_table(analysis: &CellAnalysis) -> String {
    let mut table = new_table();
    table.set_header(vec!["Grade", "Coefficient"]);
    for component in &analysis.parsed.components {
        table.add_row(vec![
            component.value.normalize().to_string(),
            component.coefficient.normalize().to_string(),
        ]);
    }
    let summary = match (&analysis.parsed.special, analysis.average) {
        (Some(special), _) => format!("special outcome: {special}"),
        (None, Some(avg)) => format!("average: {avg:.2}"),
        (None, None) => "no usable grade".to_string(),
    };
    format!("{:?}\n{}\n{}", analysis.raw, table, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgramCatalog;
    use crate::grading::parser::analyze_cell;

    #[test]
    fn lists_every_program() {
        let catalog = ProgramCatalog::builtin().expect("catalog");
        let rendered = render_programs_table(catalog.programs());
        assert!(rendered.contains("M2_S3_MAPI"));
        assert!(rendered.contains("per_subject_threshold"));
    }

    #[test]
    fn shows_cell_breakdown() {
        let rendered = render_cell_table(&analyze_cell("14,5(2) - 8(1)"));
        assert!(rendered.contains("14.5"));
        assert!(rendered.contains("average: 12.33"));
        let special = render_cell_table(&analyze_cell("Validé ( - ASE)"));
        assert!(special.contains("special outcome: Validé"));
    }
}
