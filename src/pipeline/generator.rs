use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::collector::Collector;
use super::readme::ReadmeRenderer;
use super::workflow::WorkflowRenderer;
use crate::config::Config;
use crate::notebook::Notebook;

/// What a generation run touched.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub notebooks: Vec<Notebook>,
    /// Workflow files written (or that would be written in dry-run mode)
    pub workflows_changed: Vec<PathBuf>,
    /// README path when it was written (or would be in dry-run mode)
    pub readme_changed: Option<PathBuf>,
    /// Set when the README was verified instead of written
    pub readme_checked: bool,
}

/// Runs discovery and both renderers over one scan root.
pub struct Generator {
    root: PathBuf,
    config: Config,
    dry_run: bool,
    check_readme: bool,
}

impl Generator {
    pub fn new(root: &Path, config: Config) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            dry_run: false,
            check_readme: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Compare the README against a fresh render instead of writing it.
    pub fn with_check_readme(mut self, check: bool) -> Self {
        self.check_readme = check;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn discover(&self) -> Result<Vec<Notebook>> {
        let mut collector = Collector::new(&self.root);
        if self.config.generation.apply_exclusions {
            collector =
                collector.with_exclusions(self.config.generation.excluded_notebooks.clone());
        }
        collector.collect()
    }

    pub fn run(&self) -> Result<GenerationReport> {
        let notebooks = self.discover()?;
        if notebooks.is_empty() {
            warn!("No notebooks found under {}", self.root.display());
        }

        let mut report = GenerationReport::default();

        if self.config.generation.enable_workflows {
            report.workflows_changed = WorkflowRenderer::new(&self.config).write_all(
                &self.root,
                &notebooks,
                self.dry_run,
            )?;
        } else {
            info!("Workflow generation disabled");
        }

        let readme = ReadmeRenderer::new(&self.config);
        if self.check_readme {
            readme.check(&self.root, &notebooks)?;
            report.readme_checked = true;
        } else if !self.config.generation.enable_readme {
            info!("README generation disabled");
        } else if self.dry_run {
            let document = readme.render_document(&self.root, &notebooks)?;
            print!("{}", document);
            let path = readme.output_path(&self.root);
            if fs::read_to_string(&path).ok().as_deref() != Some(document.as_str()) {
                info!("[dry-run] would write {}", path.display());
                report.readme_changed = Some(path);
            }
        } else if readme.write(&self.root, &notebooks)? {
            report.readme_changed = Some(readme.output_path(&self.root));
        }

        report.notebooks = notebooks;
        Ok(report)
    }
}
