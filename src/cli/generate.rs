use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::pipeline::generator::{GenerationReport, Generator};

#[allow(clippy::too_many_arguments)]
pub fn run(
    path: String,
    config_path: Option<String>,
    branch_override: Option<String>,
    only_workflows: bool,
    only_readme: bool,
    check_readme: bool,
    apply_exclusions: bool,
    dry_run: bool,
) -> Result<GenerationReport> {
    let root = Path::new(&path);
    info!("Scan root: {}", root.display());
    if let Some(ref cfg) = config_path {
        info!("Config: {}", cfg);
    }
    info!("Dry run: {}", dry_run);

    let mut config = Config::load_with_path(root, config_path)?;

    // Apply CLI overrides
    if let Some(branch) = branch_override {
        info!("CLI override: branch = {:?}", branch);
        config.generation.branch = branch;
    }
    if only_workflows || only_readme {
        info!(
            "CLI override: workflows = {}, readme = {}",
            only_workflows, only_readme
        );
        config.generation.enable_workflows = only_workflows;
        config.generation.enable_readme = only_readme;
    } else if check_readme {
        info!("Check mode: workflows are not written");
        config.generation.enable_workflows = false;
    }
    if apply_exclusions {
        info!(
            "CLI override: excluding {:?}",
            config.generation.excluded_notebooks
        );
        config.generation.apply_exclusions = true;
    }
    config.validate()?;

    let report = Generator::new(root, config)
        .with_dry_run(dry_run)
        .with_check_readme(check_readme)
        .run()?;

    info!(
        "Processed {} notebooks: {} workflow(s) changed, README {}",
        report.notebooks.len(),
        report.workflows_changed.len(),
        if report.readme_checked {
            "up to date"
        } else if report.readme_changed.is_some() {
            "changed"
        } else {
            "unchanged"
        }
    );
    Ok(report)
}
