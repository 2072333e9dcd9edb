use anyhow::{bail, Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::notebook::{Notebook, NOTEBOOK_EXTENSION};

/// Finds every notebook under a root directory.
pub struct Collector {
    root: PathBuf,
    excluded: Vec<String>,
}

impl Collector {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            excluded: Vec::new(),
        }
    }

    /// Skip notebooks whose name (file stem) is in `names`.
    pub fn with_exclusions(mut self, names: Vec<String>) -> Self {
        self.excluded = names;
        self
    }

    /// Notebooks sorted by relative path. Hidden files and directories are
    /// never matched.
    pub fn collect(&self) -> Result<Vec<Notebook>> {
        let root = self.normalized_root();
        let root_str = root
            .to_str()
            .with_context(|| format!("Root path is not valid UTF-8: {}", self.root.display()))?;
        let pattern = if root_str.is_empty() {
            format!("**/*.{}", NOTEBOOK_EXTENSION)
        } else if root_str.ends_with('/') {
            format!("{}**/*.{}", Pattern::escape(root_str), NOTEBOOK_EXTENSION)
        } else {
            format!("{}/**/*.{}", Pattern::escape(root_str), NOTEBOOK_EXTENSION)
        };
        debug!("Globbing {}", pattern);

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: true,
        };

        let mut notebooks = Vec::new();
        for entry in glob::glob_with(&pattern, options)
            .with_context(|| format!("Invalid notebook pattern {}", pattern))?
        {
            let path = entry.context("Failed to read directory entry")?;
            if !path.is_file() {
                continue;
            }
            let relative = relative_path(&root, &path)?;
            if relative.split('/').any(|segment| segment.starts_with('.')) {
                continue;
            }
            let notebook = Notebook::new(relative);
            if self.excluded.iter().any(|name| name == notebook.name()) {
                debug!("Excluding {}", notebook);
                continue;
            }
            notebooks.push(notebook);
        }

        notebooks.sort();
        info!(
            "Found {} notebooks under {}",
            notebooks.len(),
            self.root.display()
        );
        Ok(notebooks)
    }

    /// The root without `.` components. Glob results never carry a leading
    /// `./`, so matches are stripped against this form.
    fn normalized_root(&self) -> PathBuf {
        self.root
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    }
}

/// `/`-joined path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).with_context(|| {
        format!(
            "Notebook {} is not under the scan root {}",
            path.display(),
            root.display()
        )
    })?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => match segment.to_str() {
                Some(s) => segments.push(s),
                None => bail!("Notebook path is not valid UTF-8: {}", path.display()),
            },
            Component::CurDir => {}
            _ => bail!("Unexpected path outside the scan root: {}", path.display()),
        }
    }
    Ok(segments.join("/"))
}
