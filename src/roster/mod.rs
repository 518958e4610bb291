pub mod appreciations;
pub mod batch;
pub mod loader;
pub mod normalize;

use serde::{Deserialize, Serialize};

use crate::grading::GradeSheet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentIdentity {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub group_code: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub group_extended: String,
    #[serde(default)]
    pub absences_justified: String,
    #[serde(default)]
    pub absences_unjustified: String,
    #[serde(default)]
    pub lateness: String,
}

/// One student line: identity fields plus every raw cell of the row, kept
/// positionally so the program layout can pick grade columns out of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentRow {
    #[serde(flatten)]
    pub identity: StudentIdentity,
    #[serde(default)]
    pub cells: Vec<String>,
    #[serde(default)]
    pub appreciation: Option<String>,
}

impl StudentRow {
    pub fn is_complete(&self) -> bool {
        !self.identity.name.trim().is_empty() && !self.identity.code.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentReport {
    pub student: StudentIdentity,
    pub appreciation: Option<String>,
    pub sheet: GradeSheet,
}
