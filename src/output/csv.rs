use anyhow::Result;

use crate::catalog::ProgramConfig;
use crate::grading::ceil_hundredths;
use crate::roster::StudentReport;

pub fn reports_to_csv(reports: &[StudentReport]) -> Result<String> {
    let unit_names: Vec<String> = reports
        .first()
        .map(|r| r.sheet.units.iter().map(|u| u.name.clone()).collect())
        .unwrap_or_default();

    let mut writer = csv::Writer::from_writer(vec![]);
    let mut header = vec![
        "name".to_string(),
        "code".to_string(),
        "program".to_string(),
        "average".to_string(),
        "credits".to_string(),
        "result".to_string(),
    ];
    for name in &unit_names {
        header.push(format!("{name}_average"));
        header.push(format!("{name}_credits"));
        header.push(format!("{name}_result"));
    }
    writer.write_record(&header)?;

    for report in reports {
        let sheet = &report.sheet;
        let mut record = vec![
            report.student.name.clone(),
            report.student.code.clone(),
            sheet.program.clone(),
            format!("{:.2}", sheet.overall.average),
            sheet.overall.credit_total.normalize().to_string(),
            sheet
                .overall
                .state
                .map(|s| s.code().to_string())
                .unwrap_or_default(),
        ];
        for name in &unit_names {
            match sheet.unit(name) {
                Some(unit) => {
                    record.push(
                        unit.average
                            .map(|a| format!("{:.2}", ceil_hundredths(a)))
                            .unwrap_or_default(),
                    );
                    record.push(unit.credit_total.normalize().to_string());
                    record.push(unit.state.code().to_string());
                }
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        writer.write_record(&record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn programs_to_csv<'a, I>(programs: I) -> Result<String>
where
    I: IntoIterator<Item = &'a ProgramConfig>,
{
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["program", "template", "subjects", "units", "hidden", "credits"])?;
    for program in programs {
        writer.write_record([
            program.key.to_string(),
            program.template.clone().unwrap_or_default(),
            program.subject_count().to_string(),
            program
                .units
                .iter()
                .map(|u| format!("{}:{}", u.name, u.policy.as_slug()))
                .collect::<Vec<_>>()
                .join(" "),
            program
                .hidden
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" "),
            program.credits.len().to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgramCatalog;
    use crate::roster::batch::{evaluate_batch, BatchOptions};
    use crate::roster::{StudentIdentity, StudentRow};

    #[test]
    fn writes_one_line_per_student_with_unit_columns() {
        let mut catalog = ProgramCatalog::builtin().expect("catalog");
        catalog
            .apply_credit_file(r#"{ "BG-TP-2": [ { "ECTS1": 3, "ECTS2": 3 } ] }"#)
            .expect("credits");
        let program = catalog.get("BG_TP_2").expect("program");
        let row = StudentRow {
            identity: StudentIdentity {
                name: "Anne".to_string(),
                code: "C1".to_string(),
                ..StudentIdentity::default()
            },
            cells: vec![
                String::new(),
                String::new(),
                String::new(),
                "7".to_string(),
                "15".to_string(),
            ],
            appreciation: None,
        };
        let outcome = evaluate_batch(program, &[row], BatchOptions::default());
        let csv = reports_to_csv(&outcome.reports).expect("csv");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "name,code,program,average,credits,result,UE1_average,UE1_credits,UE1_result"
        );
        assert_eq!(lines[1], "Anne,C1,BG_TP_2,11.00,3,NV,11.00,3,NV");
    }

    #[test]
    fn lists_catalog_programs() {
        let catalog = ProgramCatalog::builtin().expect("catalog");
        let csv = programs_to_csv(catalog.programs()).expect("csv");
        assert_eq!(csv.lines().count(), 20);
        assert!(csv.contains("M1_S1,modeleM1S1.docx,15,"));
    }
}
