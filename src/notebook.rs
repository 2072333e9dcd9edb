use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// A discovered notebook, addressed by its `/`-separated path relative to
/// the scan root. Every naming attribute is derived from that path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Notebook {
    path: String,
}

impl Notebook {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name without the notebook extension.
    pub fn name(&self) -> &str {
        let file_name = self.path.rsplit('/').next().unwrap_or(self.path.as_str());
        file_name
            .strip_suffix(NOTEBOOK_EXTENSION)
            .and_then(|stem| stem.strip_suffix('.'))
            .unwrap_or(file_name)
    }

    /// Containing directory, empty for notebooks at the scan root.
    pub fn folder(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map(|(folder, _)| folder)
            .unwrap_or("")
    }

    pub fn classification(&self) -> String {
        self.folder().replace('/', "-")
    }

    /// First path segment.
    pub fn area(&self) -> &str {
        self.segment(0)
    }

    /// Second path segment, empty when the path is a bare file name.
    pub fn sub_area(&self) -> &str {
        self.segment(1)
    }

    fn segment(&self, index: usize) -> &str {
        self.path.split('/').nth(index).unwrap_or("")
    }

    /// Unique workflow key: `<prefix>-<classification>-<name>`.
    pub fn workflow_id(&self, prefix: &str) -> String {
        let classification = self.classification();
        if classification.is_empty() {
            format!("{}-{}", prefix, self.name())
        } else {
            format!("{}-{}-{}", prefix, classification, self.name())
        }
    }
}

impl fmt::Display for Notebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Read a notebook and look up its description. Unreadable files and
/// malformed JSON are errors; a missing or oddly shaped description is not.
pub fn read_description(path: &Path) -> Result<Option<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notebook {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse notebook JSON {}", path.display()))?;
    Ok(extract_description(&document))
}

/// `metadata.description.description`, when it is a string.
pub fn extract_description(document: &Value) -> Option<String> {
    document
        .get("metadata")?
        .get("description")?
        .get("description")?
        .as_str()
        .map(str::to_string)
}
