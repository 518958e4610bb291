use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::credits::CreditTable;
use crate::grading::EvaluationPolicy;

/// Program identifier such as `M1_S1` or `BG_ALT_3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProgramKey(String);

impl ProgramKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the ECTS credit file stores this program.
    pub fn credits_key(&self) -> String {
        self.0.replace('_', "-")
    }
}

impl Display for ProgramKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid program key: {0:?}")]
pub struct ProgramKeyParseError(pub String);

impl FromStr for ProgramKey {
    type Err = ProgramKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_uppercase()
            .replace(['-', ' '], "_");
        if normalized.is_empty()
            || !normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ProgramKeyParseError(s.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for ProgramKey {
    type Error = ProgramKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProgramKey> for String {
    fn from(value: ProgramKey) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitDefinition {
    pub name: String,
    pub subjects: Vec<usize>,
    #[serde(default)]
    pub policy: EvaluationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramConfig {
    pub key: ProgramKey,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
    pub grade_columns: Vec<usize>,
    pub units: Vec<UnitDefinition>,
    #[serde(default)]
    pub hidden: BTreeSet<usize>,
    #[serde(default)]
    pub credits: CreditTable,
}

impl ProgramConfig {
    /// Raw cell of a 1-based subject position; empty when the row or the
    /// layout has no such column.
    pub fn cell<'a>(&self, cells: &'a [String], position: usize) -> &'a str {
        position
            .checked_sub(1)
            .and_then(|idx| self.grade_columns.get(idx))
            .and_then(|column| cells.get(*column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_hidden(&self, position: usize) -> bool {
        self.hidden.contains(&position)
    }

    pub fn unit_positions(&self) -> BTreeSet<usize> {
        self.units
            .iter()
            .flat_map(|u| u.subjects.iter().copied())
            .collect()
    }

    /// Highest subject position referenced by columns or units.
    pub fn subject_count(&self) -> usize {
        let unit_max = self.unit_positions().last().copied().unwrap_or(0);
        unit_max.max(self.grade_columns.len())
    }

    pub fn matches_file_name(&self, file_name: &str) -> bool {
        let stem = file_stem(file_name);
        self.file_names
            .iter()
            .any(|known| file_stem(known).eq_ignore_ascii_case(stem))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            for position in &unit.subjects {
                if *position == 0 {
                    return Err(CatalogError::InvalidPosition {
                        program: self.key.to_string(),
                        unit: unit.name.clone(),
                        position: *position,
                    });
                }
                if !seen.insert(*position) {
                    return Err(CatalogError::DuplicatePosition {
                        program: self.key.to_string(),
                        position: *position,
                    });
                }
            }
        }
        Ok(())
    }
}

fn file_stem(file_name: &str) -> &str {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed parsing program catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed parsing ECTS credit file: {0}")]
    CreditFile(#[from] serde_json::Error),
    #[error("program {0} is declared twice")]
    DuplicateProgram(String),
    #[error("program {program}: unit {unit} references invalid subject position {position}")]
    InvalidPosition {
        program: String,
        unit: String,
        position: usize,
    },
    #[error("program {program}: subject position {position} belongs to more than one unit")]
    DuplicatePosition { program: String, position: usize },
    #[error("invalid ECTS key: {0}")]
    InvalidCreditKey(String),
    #[error("unknown program: {0}")]
    UnknownProgram(String),
}
