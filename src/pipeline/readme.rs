use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::NbgenError;
use crate::notebook::{self, Notebook};
use crate::util::{escape_table_cell, write_if_changed};

/// One line of the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeRow {
    pub area: String,
    pub sub_area: String,
    pub name: String,
    pub path: String,
    pub workflow_id: String,
    /// `None` renders the placeholder.
    pub description: Option<String>,
}

impl ReadmeRow {
    pub fn new(notebook: &Notebook, prefix: &str, description: Option<String>) -> Self {
        Self {
            area: notebook.area().to_string(),
            sub_area: notebook.sub_area().to_string(),
            name: notebook.name().to_string(),
            path: notebook.path().to_string(),
            workflow_id: notebook.workflow_id(prefix),
            description,
        }
    }
}

/// Renders the README status table and wraps it in the prefix/suffix
/// fragments.
pub struct ReadmeRenderer<'a> {
    config: &'a Config,
}

impl<'a> ReadmeRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn branch(&self) -> &str {
        self.config.readme_branch()
    }

    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(&self.config.readme.output)
    }

    pub fn header(&self) -> String {
        format!(
            "Test Status is for branch - **_{}_**\n|Area|Sub-Area|Notebook|Description|Status|\n|--|--|--|--|--|\n",
            self.branch()
        )
    }

    pub fn render_row(&self, row: &ReadmeRow) -> String {
        let base = self.config.readme.badge_base_url.trim_end_matches('/');
        let description = match &row.description {
            Some(text) => escape_table_cell(text),
            None => self.config.readme.placeholder.clone(),
        };
        let link = format!("[{}]({})", row.name, row.path);
        let status = format!(
            "[![{name}]({base}/{id}.yml/badge.svg?branch={branch})]({base}/{id}.yml)",
            name = row.name,
            base = base,
            id = row.workflow_id,
            branch = self.branch()
        );
        format!("|{}|{}|{}|{}|{}|", row.area, row.sub_area, link, description, status)
    }

    /// Build a row per notebook, reading descriptions from disk.
    pub fn rows(&self, root: &Path, notebooks: &[Notebook]) -> Result<Vec<ReadmeRow>> {
        let mut rows = Vec::with_capacity(notebooks.len());
        for nb in notebooks {
            let description = notebook::read_description(&root.join(nb.path()))?;
            if description.is_none() {
                debug!("{} has no description", nb);
            }
            rows.push(ReadmeRow::new(nb, &self.config.workflow.prefix, description));
        }
        Ok(rows)
    }

    pub fn render_table(&self, rows: &[ReadmeRow]) -> String {
        let mut table = self.header();
        for row in rows {
            table.push_str(&self.render_row(row));
            table.push('\n');
        }
        table
    }

    /// The full README: prefix fragment, table, suffix fragment.
    pub fn render_document(&self, root: &Path, notebooks: &[Notebook]) -> Result<String> {
        let prefix = read_fragment(&root.join(&self.config.readme.prefix))?;
        let suffix = read_fragment(&root.join(&self.config.readme.suffix))?;
        let rows = self.rows(root, notebooks)?;
        Ok(format!("{}{}{}", prefix, self.render_table(&rows), suffix))
    }

    /// Render and write the README. Returns true when the file changed.
    pub fn write(&self, root: &Path, notebooks: &[Notebook]) -> Result<bool> {
        let path = self.output_path(root);
        info!("Writing {}...", path.display());
        let document = self.render_document(root, notebooks)?;
        let changed = write_if_changed(&path, &document)?;
        info!(
            "Finished writing {} ({})",
            path.display(),
            if changed { "updated" } else { "unchanged" }
        );
        Ok(changed)
    }

    /// Fail with `ReadmeOutOfDate` unless the README on disk matches what
    /// would be generated.
    pub fn check(&self, root: &Path, notebooks: &[Notebook]) -> Result<()> {
        let path = self.output_path(root);
        let document = self.render_document(root, notebooks)?;
        let current = fs::read_to_string(&path).ok();
        if current.as_deref() != Some(document.as_str()) {
            return Err(NbgenError::ReadmeOutOfDate { path }.into());
        }
        info!("{} is up to date", path.display());
        Ok(())
    }
}

fn read_fragment(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read README fragment {}", path.display()))
}
