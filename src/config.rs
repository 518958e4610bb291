use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::ProgramCatalog;
use crate::roster::batch::BatchOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// Program catalog TOML; empty uses the built-in catalog.
    #[serde(default)]
    pub path: String,
    /// ECTS credit JSON merged over the catalog.
    #[serde(default)]
    pub ects_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub skip_incomplete_rows: bool,
    #[serde(default)]
    pub header_row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<String>,
    pub ects_path: Option<String>,
    pub output_dir: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/bulletin-engine/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.catalog_path {
            self.catalog.path = path;
        }
        if let Some(path) = overrides.ects_path {
            self.catalog.ects_path = path;
        }
        if let Some(dir) = overrides.output_dir {
            self.output.dir = dir;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_catalog_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.catalog.path)
    }

    pub fn resolved_ects_path(&self) -> Option<PathBuf> {
        non_empty_path(&self.catalog.ects_path)
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        expand_tilde(&self.output.dir)
    }

    /// Program catalog with the configured ECTS credit file merged in.
    pub fn load_catalog(&self) -> Result<ProgramCatalog> {
        let catalog_path = self.resolved_catalog_path();
        let mut catalog = ProgramCatalog::load(catalog_path.as_deref())?;
        if let Some(ects_path) = self.resolved_ects_path() {
            catalog.load_credit_file(&ects_path)?;
        }
        Ok(catalog)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            parallel: self.batch.parallel,
            skip_incomplete_rows: self.batch.skip_incomplete_rows,
        }
    }

    pub fn default_template() -> String {
        let template = r#"[catalog]
# Program catalog TOML; leave empty for the built-in programs.
path = ""
# ECTS credit JSON: { "M1-S1": [ { "ECTS1": 4, ... } ] }
ects_path = ""

[output]
dir = "~/.local/share/bulletin-engine/reports"

[batch]
parallel = true
skip_incomplete_rows = true
# Zero-based line holding the column names in student CSV files.
header_row = 0

[server]
host = "127.0.0.1"
port = 3001
"#;
        template.to_string()
    }
}

fn non_empty_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    (!trimmed.is_empty()).then(|| expand_tilde(trimmed))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            skip_incomplete_rows: true,
            header_row: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_output_dir() -> String {
    "~/.local/share/bulletin-engine/reports".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template");
        assert!(parsed.catalog.path.is_empty());
        assert!(parsed.batch.parallel);
        assert_eq!(parsed.batch.header_row, 0);
        assert_eq!(parsed.server.port, 3001);
        assert_eq!(parsed.output.dir, default_output_dir());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("[batch]\nheader_row = 1\n").expect("partial");
        assert_eq!(parsed.batch.header_row, 1);
        assert!(parsed.batch.skip_incomplete_rows);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert!(parsed.resolved_catalog_path().is_none());
    }

    #[test]
    fn overrides_replace_configured_paths() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            catalog_path: Some("programs.toml".to_string()),
            ects_path: None,
            output_dir: Some("out".to_string()),
        });
        assert_eq!(
            config.resolved_catalog_path(),
            Some(PathBuf::from("programs.toml"))
        );
        assert_eq!(config.resolved_output_dir(), PathBuf::from("out"));
        assert!(config.resolved_ects_path().is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/bulletin-engine.toml")))
            .expect("defaults");
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn default_config_loads_builtin_catalog() {
        let catalog = Config::default().load_catalog().expect("catalog");
        assert!(catalog.get("M1_S1").is_ok());
    }
}
