use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::credits::parse_credit_file;
use crate::catalog::schema::{CatalogError, ProgramConfig, ProgramKey};

const BUILTIN_CATALOG: &str = include_str!("../../data/programs.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "program")]
    programs: Vec<ProgramConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramCatalog {
    programs: BTreeMap<ProgramKey, ProgramConfig>,
}

impl ProgramCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(data)?;
        let mut programs = BTreeMap::new();
        for program in file.programs {
            program.validate()?;
            let key = program.key.clone();
            if programs.insert(key.clone(), program).is_some() {
                return Err(CatalogError::DuplicateProgram(key.to_string()));
            }
        }
        Ok(Self { programs })
    }

    /// Catalog from `path`, or the built-in one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::builtin()?);
        };
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed reading program catalog: {}", path.display()))?;
        let catalog = Self::from_toml_str(&data)
            .with_context(|| format!("invalid program catalog: {}", path.display()))?;
        info!(
            path = %path.display(),
            programs = catalog.len(),
            "loaded program catalog"
        );
        Ok(catalog)
    }

    /// Merges ECTS weights from a credit file; returns how many programs were updated.
    pub fn apply_credit_file(&mut self, json: &str) -> Result<usize, CatalogError> {
        let tables = parse_credit_file(json)?;
        let mut updated = 0;
        for program in self.programs.values_mut() {
            if let Some(table) = tables.get(&program.key.credits_key()) {
                program.credits.merge(table);
                updated += 1;
                debug!(program = %program.key, credits = table.len(), "applied credit table");
            }
        }
        Ok(updated)
    }

    pub fn load_credit_file(&mut self, path: &Path) -> Result<usize> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed reading ECTS credit file: {}", path.display()))?;
        let updated = self
            .apply_credit_file(&data)
            .with_context(|| format!("invalid ECTS credit file: {}", path.display()))?;
        info!(path = %path.display(), updated, "loaded ECTS credits");
        Ok(updated)
    }

    pub fn get(&self, key: &str) -> Result<&ProgramConfig, CatalogError> {
        key.parse::<ProgramKey>()
            .ok()
            .and_then(|key| self.programs.get(&key))
            .ok_or_else(|| CatalogError::UnknownProgram(key.to_string()))
    }

    /// Recognises a program from an upload file name, falling back to a file
    /// named after the program key itself (`M1_S1.csv`).
    pub fn detect(&self, file_name: &str) -> Result<&ProgramConfig, CatalogError> {
        if let Some(program) = self
            .programs
            .values()
            .find(|p| p.matches_file_name(file_name))
        {
            return Ok(program);
        }
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        self.get(stem)
            .map_err(|_| CatalogError::UnknownProgram(file_name.to_string()))
    }

    pub fn programs(&self) -> impl Iterator<Item = &ProgramConfig> {
        self.programs.values()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
