use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Pretty JSON with a trailing newline, written to `path`.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = render_json(value)?;
    body.push('\n');
    fs::write(path, body).with_context(|| format!("failed writing {}", path.display()))
}
