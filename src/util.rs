//! Shared utilities for the nbgen codebase

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::NbgenError;

/// Generated workflows are shell-heavy and assume a Unix toolchain
/// (`sed -i`, `md5sum`, `bash`).
pub fn ensure_posix() -> Result<(), NbgenError> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(NbgenError::UnsupportedPlatform {
            os: std::env::consts::OS,
        })
    }
}

/// Write `content` to `path` unless the file already holds exactly that.
/// Returns true when the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == content {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Escape a `sed` search pattern placed inside `sed -e "s/.../.../g"`.
/// Only the delimiter and the surrounding double quote are touched; regex
/// syntax in the pattern is passed through.
pub fn sed_escape_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '/' | '"' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape a `sed` replacement so it is inserted literally. `&` and `\` are
/// special to sed; a backslash also has to survive the double-quoted shell
/// string, so it is doubled twice.
pub fn sed_escape_replacement(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\\\\\"),
            '&' | '/' | '"' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Make text safe for a single markdown table cell.
pub fn escape_table_cell(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}
