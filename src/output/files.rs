use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::output::json::write_json_file;
use crate::output::placeholders::{build_placeholders, PlaceholderMap};
use crate::roster::normalize::report_file_stem;
use crate::roster::StudentReport;

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    program: &'a str,
    template: Option<&'a str>,
    placeholders: PlaceholderMap,
}

/// Writes one `<name>_bulletin.json` per student into `dir`. Students sharing
/// a name get their learner code appended.
pub fn write_report_files(
    dir: &Path,
    reports: &[StudentReport],
    template: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed creating output directory: {}", dir.display()))?;

    let mut used = BTreeSet::new();
    let mut written = Vec::with_capacity(reports.len());
    for report in reports {
        let mut stem = report_file_stem(&report.student.name);
        if !used.insert(stem.clone()) {
            stem = report_file_stem(&format!("{} {}", report.student.name, report.student.code));
            used.insert(stem.clone());
        }
        let path = dir.join(format!("{stem}.json"));
        let file = ReportFile {
            program: &report.sheet.program,
            template,
            placeholders: build_placeholders(report, today),
        };
        write_json_file(&path, &file)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "report files written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::grading::{GradeSheet, OverallResult};
    use crate::roster::StudentIdentity;

    fn report(name: &str, code: &str) -> StudentReport {
        StudentReport {
            student: StudentIdentity {
                name: name.to_string(),
                code: code.to_string(),
                ..StudentIdentity::default()
            },
            appreciation: None,
            sheet: GradeSheet {
                program: "DEMO".to_string(),
                units: Vec::new(),
                unassigned: Vec::new(),
                overall: OverallResult {
                    average: Decimal::ZERO,
                    credit_total: Decimal::ZERO,
                    state: None,
                },
            },
        }
    }

    #[test]
    fn writes_one_file_per_student() {
        let dir = std::env::temp_dir().join(format!("bulletin-files-{}", std::process::id()));
        let today = NaiveDate::from_ymd_opt(2025, 2, 3).expect("date");
        let reports = [report("Zoé Durand", "A1"), report("Zoé Durand", "A2")];
        let written =
            write_report_files(&dir, &reports, Some("modeleM1S1.docx"), today).expect("write");
        let names: Vec<String> = written
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![
                "zoe_durand_bulletin.json".to_string(),
                "zoe_durand_a2_bulletin.json".to_string()
            ]
        );
        let body = fs::read_to_string(&written[0]).expect("read");
        assert!(body.contains("\"template\": \"modeleM1S1.docx\""));
        assert!(body.contains("\"datedujour\": \"03/02/2025\""));
        fs::remove_dir_all(&dir).expect("cleanup");
    }
}
