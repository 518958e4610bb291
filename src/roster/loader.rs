use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::roster::normalize::normalize_header;
use crate::roster::{StudentIdentity, StudentRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IdentityField {
    Name,
    Code,
    BirthDate,
    Site,
    GroupCode,
    GroupName,
    GroupExtended,
    AbsencesJustified,
    AbsencesUnjustified,
    Lateness,
    Appreciation,
}

impl IdentityField {
    fn from_header(header: &str) -> Option<Self> {
        let field = match normalize_header(header).as_str() {
            "nom" => Self::Name,
            "codeapprenant" => Self::Code,
            "datedenaissance" => Self::BirthDate,
            "nomsite" => Self::Site,
            "codegroupe" => Self::GroupCode,
            "nomgroupe" => Self::GroupName,
            "etendugroupe" => Self::GroupExtended,
            "absjustifiees" => Self::AbsencesJustified,
            "absinjustifiees" => Self::AbsencesUnjustified,
            "retards" => Self::Lateness,
            "appreciations" | "appreciation" => Self::Appreciation,
            _ => return None,
        };
        Some(field)
    }
}

/// Reads student rows from a CSV export. `header_row` is the zero-based line
/// holding column names; lines above it are titles and are ignored.
pub fn load_rows(path: &Path, header_row: usize) -> Result<Vec<StudentRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed opening student file: {}", path.display()))?;
    read_rows(file, header_row)
        .with_context(|| format!("failed reading student file: {}", path.display()))
}

pub fn read_rows<R: Read>(reader: R, header_row: usize) -> Result<Vec<StudentRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = reader.records();

    for _ in 0..header_row {
        records
            .next()
            .transpose()?
            .ok_or_else(|| anyhow!("file ends before header row {header_row}"))?;
    }
    let header = records
        .next()
        .transpose()?
        .ok_or_else(|| anyhow!("missing header row {header_row}"))?;

    let mut columns = BTreeMap::new();
    for (idx, name) in header.iter().enumerate() {
        if let Some(field) = IdentityField::from_header(name) {
            columns.entry(field).or_insert(idx);
        }
    }
    if !columns.contains_key(&IdentityField::Name) {
        return Err(anyhow!("header row has no Nom column"));
    }
    debug!(columns = columns.len(), "identity columns recognised");

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let field = |field: IdentityField| -> String {
            columns
                .get(&field)
                .and_then(|idx| cells.get(*idx))
                .cloned()
                .unwrap_or_default()
        };
        let appreciation = Some(field(IdentityField::Appreciation)).filter(|a| !a.is_empty());
        let identity = StudentIdentity {
            name: field(IdentityField::Name),
            code: field(IdentityField::Code),
            birth_date: field(IdentityField::BirthDate),
            site: field(IdentityField::Site),
            group_code: field(IdentityField::GroupCode),
            group_name: field(IdentityField::GroupName),
            group_extended: field(IdentityField::GroupExtended),
            absences_justified: field(IdentityField::AbsencesJustified),
            absences_unjustified: field(IdentityField::AbsencesUnjustified),
            lateness: field(IdentityField::Lateness),
        };
        rows.push(StudentRow {
            identity,
            cells,
            appreciation,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Bulletin M1 S1,,,,,
CodeApprenant,Nom,Nom Groupe,Matière 1,Matière 2,ABS justifiées
A001,Zoé Durand,M1 MAPI,14(2) - 8(1),12,2
A002,Léo Petit,M1 MAPI,9,\"11,5\",0
,,,,,
";

    #[test]
    fn reads_identity_and_cells_after_title_line() {
        let rows = read_rows(SAMPLE.as_bytes(), 1).expect("rows");
        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.identity.name, "Zoé Durand");
        assert_eq!(first.identity.code, "A001");
        assert_eq!(first.identity.group_name, "M1 MAPI");
        assert_eq!(first.identity.absences_justified, "2");
        assert_eq!(first.cells[3], "14(2) - 8(1)");
        assert_eq!(rows[1].cells[4], "11,5");
        assert_eq!(first.appreciation, None);
    }

    #[test]
    fn requires_a_name_column() {
        let err = read_rows("a,b\n1,2\n".as_bytes(), 0).expect_err("no Nom column");
        assert!(err.to_string().contains("Nom"));
    }

    #[test]
    fn keeps_incomplete_rows_for_the_batch_to_decide() {
        let rows = read_rows("Nom,CodeApprenant,Note\nAnne,,12\n".as_bytes(), 0).expect("rows");
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_complete());
    }
}
