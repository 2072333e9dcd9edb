//! Configuration loading and defaults as seen from outside the crate

use anyhow::Result;
use nbgen::config::{Config, CONFIG_FILE_NAME};
use nbgen::error::{exit_code_for, NbgenError};
use nbgen::notebook::Notebook;
use nbgen::pipeline::readme::ReadmeRenderer;
use nbgen::pipeline::workflow::WorkflowRenderer;
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[generation]
branch = "release-1"
excluded_notebooks = ["scratch"]
apply_exclusions = true

[workflow]
prefix = "nb"
output_dir = "ci"
enable_scheduled_runs = false
base_branch = "main"
source_dir = "notebooks"
python_version = "3.10"
kernel = "python3"

[[workflow.setup_steps]]
name = "install extras"
run = "pip install -e ."
working_directory = "."

[azure]
subscription_id = "00000000-0000-0000-0000-000000000000"
resource_group = "ci-rg"
workspace_name = "ci-ws"

[readme]
badge_base_url = "https://github.com/example/repo/actions/workflows"
placeholder = "-"

[[special_cases]]
notebook = "train"

[[special_cases.substitutions]]
comment = "shrink the dataset"
find = "epochs=10"
replace = "epochs=1"
"#;

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert!(config.generation.enable_workflows);
    assert!(config.generation.enable_readme);
    assert!(config.generation.branch.is_empty());
    assert_eq!(config.readme_branch(), "main");
    assert_eq!(config.workflow.setup_steps.len(), 2);
    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_full_config_file_drives_rendering() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(tmp.path().join(CONFIG_FILE_NAME), FULL_CONFIG)?;
    let config = Config::load_with_path(tmp.path(), None)?;

    assert_eq!(config.readme_branch(), "release-1");
    assert_eq!(config.azure.credential_to, "AzureCliCredential");

    let nb = Notebook::new("jobs/train/train.ipynb");
    let yaml = WorkflowRenderer::new(&config).render(&nb);
    assert!(yaml.starts_with("name: nb-jobs-train-train\n"));
    assert!(!yaml.contains("schedule:"));
    assert!(yaml.contains("      - main\n      - release-1\n"));
    assert!(yaml.contains("python-version: \"3.10\""));
    assert!(yaml.contains("    - name: install extras\n      run: pip install -e .\n"));
    assert!(!yaml.contains("setup SDK"));
    assert!(yaml.contains("s/<RESOURCE_GROUP>/ci-rg/g"));
    assert!(yaml.contains("\n          # shrink the dataset\n          sed -i -e \"s/epochs=10/epochs=1/g\" train.ipynb\n"));
    assert!(yaml.contains("papermill train.ipynb - -k python3\n"));
    assert!(yaml.ends_with("      working-directory: notebooks/jobs/train\n"));

    let path = WorkflowRenderer::new(&config).output_path(tmp.path(), &nb);
    assert_eq!(path, tmp.path().join("ci").join("nb-jobs-train-train.yml"));

    let readme = ReadmeRenderer::new(&config);
    assert!(readme.header().contains("**_release-1_**"));

    Ok(())
}

#[test]
fn test_explicit_config_path_wins() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(
        tmp.path().join(CONFIG_FILE_NAME),
        "[workflow]\nprefix = \"repo\"\n",
    )?;
    let explicit = tmp.path().join("other.toml");
    fs::write(&explicit, "[workflow]\nprefix = \"explicit\"\n")?;

    let config = Config::load_with_path(tmp.path(), Some(explicit.display().to_string()))?;
    assert_eq!(config.workflow.prefix, "explicit");
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(
        tmp.path().join(CONFIG_FILE_NAME),
        "[workflow]\nprefix = \"\"\n",
    )?;

    let err = Config::load_with_path(tmp.path(), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<NbgenError>(),
        Some(NbgenError::InvalidConfig(_))
    ));
    assert_eq!(exit_code_for(&err), 1);
    Ok(())
}
