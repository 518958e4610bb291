use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::grading::average::{ceil_hundredths, format_hundredths};
use crate::grading::{SubjectResult, UnitResult};
use crate::roster::StudentReport;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlaceholderValue {
    Number(Decimal),
    Text(String),
}

impl PlaceholderValue {
    fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    fn blank() -> Self {
        Self::Text(String::new())
    }
}

impl Display for PlaceholderValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value.normalize()),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

pub type PlaceholderMap = BTreeMap<String, PlaceholderValue>;

/// Template values for one student's report card.
///
/// Hidden positions keep blank `note`/`etat` entries but get no `ECTS` entry.
pub fn build_placeholders(report: &StudentReport, today: NaiveDate) -> PlaceholderMap {
    let mut map = PlaceholderMap::new();
    insert_identity(&mut map, report, today);

    for unit in &report.sheet.units {
        for subject in &unit.subjects {
            insert_subject(&mut map, subject, true);
        }
        insert_unit(&mut map, unit);
    }
    for subject in &report.sheet.unassigned {
        insert_subject(&mut map, subject, false);
    }

    let overall = &report.sheet.overall;
    map.insert(
        "moyenneECTS".to_string(),
        PlaceholderValue::Number(overall.credit_total),
    );
    map.insert(
        "moyenne".to_string(),
        PlaceholderValue::text(format!("{:.2}", overall.average)),
    );
    map.insert(
        "totaletat".to_string(),
        PlaceholderValue::text(overall.state.map(|s| s.code()).unwrap_or_default()),
    );
    map
}

fn insert_identity(map: &mut PlaceholderMap, report: &StudentReport, today: NaiveDate) {
    let student = &report.student;
    let fields = [
        ("nomApprenant", student.name.as_str()),
        ("CodeApprenant", student.code.as_str()),
        ("dateNaissance", student.birth_date.as_str()),
        ("codegroupe", student.group_code.as_str()),
        ("groupe", student.group_name.as_str()),
        ("etendugroupe", student.group_extended.as_str()),
        ("campus", student.site.as_str()),
        ("justifiee", student.absences_justified.as_str()),
        ("injustifiee", student.absences_unjustified.as_str()),
        ("retard", student.lateness.as_str()),
        ("appreciations", report.appreciation.as_deref().unwrap_or("")),
    ];
    for (key, value) in fields {
        map.insert(key.to_string(), PlaceholderValue::text(value));
    }
    map.insert(
        "datedujour".to_string(),
        PlaceholderValue::text(today.format("%d/%m/%Y").to_string()),
    );
}

fn insert_subject(map: &mut PlaceholderMap, subject: &SubjectResult, credited: bool) {
    let position = subject.position;
    if subject.hidden {
        map.insert(format!("note{position}"), PlaceholderValue::blank());
        map.insert(format!("etat{position}"), PlaceholderValue::blank());
        return;
    }

    let note = if let Some(special) = &subject.special {
        special.label().to_string()
    } else if subject.is_graded() || !credited {
        subject.average.map(format_hundredths).unwrap_or_default()
    } else {
        String::new()
    };
    map.insert(format!("note{position}"), PlaceholderValue::Text(note));

    let state = if subject.is_graded() {
        subject.state.code()
    } else {
        ""
    };
    map.insert(format!("etat{position}"), PlaceholderValue::text(state));

    let credit = match subject.effective_credit {
        Some(credit) if subject.is_graded() => PlaceholderValue::Number(credit),
        _ => PlaceholderValue::blank(),
    };
    map.insert(format!("ECTS{position}"), credit);
}

fn insert_unit(map: &mut PlaceholderMap, unit: &UnitResult) {
    let average = unit
        .average
        .map(|avg| format!("{:.2}", ceil_hundredths(avg)))
        .unwrap_or_default();
    map.insert(format!("moy{}", unit.name), PlaceholderValue::Text(average));
    map.insert(
        format!("etat{}", unit.name),
        PlaceholderValue::text(unit.state.code()),
    );
    map.insert(
        format!("ECTS{}", unit.name),
        PlaceholderValue::Number(unit.credit_total),
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::{ProgramConfig, UnitDefinition};
    use crate::grading::{evaluate_cells, EvaluationPolicy};
    use crate::roster::StudentIdentity;

    fn report(grades: &[&str]) -> StudentReport {
        let program = ProgramConfig {
            key: "DEMO".parse().expect("key"),
            template: None,
            file_names: Vec::new(),
            grade_columns: vec![1, 2, 3, 4, 5],
            units: vec![
                UnitDefinition {
                    name: "UE1".to_string(),
                    subjects: vec![1, 2, 3],
                    policy: EvaluationPolicy::NearPassTolerance,
                },
                UnitDefinition {
                    name: "UE2".to_string(),
                    subjects: vec![4],
                    policy: EvaluationPolicy::NearPassTolerance,
                },
            ],
            hidden: BTreeSet::from([3]),
            credits: [(1, dec!(2)), (2, dec!(4)), (3, dec!(1)), (4, dec!(3))]
                .into_iter()
                .collect(),
        };
        let mut cells = vec!["Zoé Durand".to_string()];
        cells.extend(grades.iter().map(|g| g.to_string()));
        StudentReport {
            student: StudentIdentity {
                name: "Zoé Durand".to_string(),
                code: "A001".to_string(),
                group_name: "M1 MAPI".to_string(),
                ..StudentIdentity::default()
            },
            appreciation: Some("Bravo".to_string()),
            sheet: evaluate_cells(&program, &cells),
        }
    }

    fn text(map: &PlaceholderMap, key: &str) -> String {
        map.get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "<missing>".into())
    }

    #[test]
    fn renders_subject_unit_and_overall_values() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).expect("date");
        let report = report(&["9", "12,5(1) - 14(1)", "4", "Validé ( - ASE)", "15"]);
        let map = build_placeholders(&report, today);
        assert_eq!(text(&map, "note1"), "9.00");
        assert_eq!(text(&map, "etat1"), "C");
        assert_eq!(text(&map, "ECTS1"), "2");
        assert_eq!(text(&map, "note2"), "13.25");
        assert_eq!(text(&map, "etat2"), "");
        assert_eq!(text(&map, "note3"), "");
        assert!(!map.contains_key("ECTS3"));
        assert_eq!(text(&map, "note4"), "Validé");
        assert_eq!(text(&map, "ECTS4"), "");
        assert_eq!(text(&map, "note5"), "15.00");
        assert_eq!(text(&map, "etat5"), "");
        // (9 * 2 + 13.25 * 4) / 6 = 11.8333..
        assert_eq!(text(&map, "moyUE1"), "11.84");
        assert_eq!(text(&map, "etatUE1"), "VA");
        assert_eq!(text(&map, "ECTSUE1"), "6");
        assert_eq!(text(&map, "moyUE2"), "");
        assert_eq!(text(&map, "etatUE2"), "NV");
        assert_eq!(text(&map, "moyenneECTS"), "6");
        assert_eq!(text(&map, "moyenne"), "11.84");
        assert_eq!(text(&map, "totaletat"), "NV");
        assert_eq!(text(&map, "nomApprenant"), "Zoé Durand");
        assert_eq!(text(&map, "groupe"), "M1 MAPI");
        assert_eq!(text(&map, "appreciations"), "Bravo");
        assert_eq!(text(&map, "datedujour"), "31/01/2025");
    }

    #[test]
    fn credits_serialize_as_numbers() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let map = build_placeholders(&report(&["12", "12", "", "12", ""]), today);
        let json = serde_json::to_value(&map).expect("json");
        assert!(json["ECTSUE1"].is_number());
        assert!(json["moyUE1"].is_string());
        assert_eq!(json["totaletat"], "VA");
    }
}
