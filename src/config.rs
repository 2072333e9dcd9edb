use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::NbgenError;

/// Per-repo config file name, looked up in the scan root.
pub const CONFIG_FILE_NAME: &str = "nbgen.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub readme: ReadmeConfig,

    /// Extra substitutions keyed by notebook name. Replaces the built-in
    /// table entirely when present in a config file.
    #[serde(default = "default_special_cases")]
    pub special_cases: Vec<SpecialCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Write one workflow file per notebook (default: true)
    #[serde(default = "default_true")]
    pub enable_workflows: bool,

    /// Write the README status table (default: true)
    #[serde(default = "default_true")]
    pub enable_readme: bool,

    /// Release-candidate branch. Empty means "no override": workflows only
    /// trigger on the base branch and badges point at `readme.default_branch`.
    #[serde(default)]
    pub branch: String,

    #[serde(default = "default_excluded_notebooks")]
    pub excluded_notebooks: Vec<String>,

    /// Drop `excluded_notebooks` from discovery (default: false)
    #[serde(default)]
    pub apply_exclusions: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enable_workflows: true,
            enable_readme: true,
            branch: String::new(),
            excluded_notebooks: default_excluded_notebooks(),
            apply_exclusions: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Leading part of every workflow id (default: "sdk")
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Where workflow files go, relative to the scan root
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_true")]
    pub enable_manual_calling: bool,

    #[serde(default = "default_true")]
    pub enable_scheduled_runs: bool,

    #[serde(default = "default_cron")]
    pub cron: String,

    /// Branch that pull requests target (default: "sdk-preview")
    #[serde(default = "default_base_branch")]
    pub base_branch: String,

    /// Directory the notebooks live in, relative to the repository root
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    #[serde(default = "default_runs_on")]
    pub runs_on: String,

    #[serde(default = "default_python_version")]
    pub python_version: String,

    #[serde(default = "default_requirements_file")]
    pub requirements_file: String,

    #[serde(default = "default_creds_secret")]
    pub creds_secret: String,

    /// Kernel passed to papermill
    #[serde(default = "default_kernel")]
    pub kernel: String,

    /// Best-effort setup commands, run with `continue-on-error: true`
    #[serde(default = "default_setup_steps")]
    pub setup_steps: Vec<SetupStep>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            output_dir: default_output_dir(),
            enable_manual_calling: true,
            enable_scheduled_runs: true,
            cron: default_cron(),
            base_branch: default_base_branch(),
            source_dir: default_source_dir(),
            runs_on: default_runs_on(),
            python_version: default_python_version(),
            requirements_file: default_requirements_file(),
            creds_secret: default_creds_secret(),
            kernel: default_kernel(),
            setup_steps: default_setup_steps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupStep {
    pub name: String,
    pub run: String,
    pub working_directory: String,
}

/// Values substituted into the notebook placeholders before it runs in CI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default = "default_subscription_id")]
    pub subscription_id: String,
    #[serde(default = "default_resource_group")]
    pub resource_group: String,
    #[serde(default = "default_workspace_name")]
    pub workspace_name: String,
    #[serde(default = "default_credential_from")]
    pub credential_from: String,
    #[serde(default = "default_credential_to")]
    pub credential_to: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_id: default_subscription_id(),
            resource_group: default_resource_group(),
            workspace_name: default_workspace_name(),
            credential_from: default_credential_from(),
            credential_to: default_credential_to(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadmeConfig {
    #[serde(default = "default_readme_output")]
    pub output: String,
    #[serde(default = "default_prefix_file")]
    pub prefix: String,
    #[serde(default = "default_suffix_file")]
    pub suffix: String,

    /// Badge branch when `generation.branch` is empty
    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default = "default_badge_base_url")]
    pub badge_base_url: String,

    /// Shown when a notebook carries no description
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ReadmeConfig {
    fn default() -> Self {
        Self {
            output: default_readme_output(),
            prefix: default_prefix_file(),
            suffix: default_suffix_file(),
            default_branch: default_branch(),
            badge_base_url: default_badge_base_url(),
            placeholder: default_placeholder(),
        }
    }
}

/// Extra `sed` edits for one notebook, matched by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCase {
    pub notebook: String,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// Shell comment emitted above the edit, preceded by a blank line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub find: String,
    pub replace: String,
}

impl Substitution {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            comment: None,
            find: find.into(),
            replace: replace.into(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_excluded_notebooks() -> Vec<String> {
    vec!["datastore".to_string()]
}

fn default_prefix() -> String {
    "sdk".to_string()
}

fn default_output_dir() -> String {
    "../.github/workflows".to_string()
}

fn default_cron() -> String {
    "0 */8 * * *".to_string()
}

fn default_base_branch() -> String {
    "sdk-preview".to_string()
}

fn default_source_dir() -> String {
    "sdk".to_string()
}

fn default_runs_on() -> String {
    "ubuntu-latest".to_string()
}

fn default_python_version() -> String {
    "3.8".to_string()
}

fn default_requirements_file() -> String {
    "notebooks/dev-requirements.txt".to_string()
}

fn default_creds_secret() -> String {
    "${{secrets.AZ_AE_CREDS}}".to_string()
}

fn default_kernel() -> String {
    "python".to_string()
}

fn default_setup_steps() -> Vec<SetupStep> {
    vec![
        SetupStep {
            name: "setup SDK".to_string(),
            run: "bash setup.sh".to_string(),
            working_directory: "sdk".to_string(),
        },
        SetupStep {
            name: "setup CLI".to_string(),
            run: "bash setup.sh".to_string(),
            working_directory: "cli".to_string(),
        },
    ]
}

fn default_subscription_id() -> String {
    "6560575d-fa06-4e7d-95fb-f962e74efd7a".to_string()
}

fn default_resource_group() -> String {
    "azureml-examples-rg".to_string()
}

fn default_workspace_name() -> String {
    "main".to_string()
}

fn default_credential_from() -> String {
    "InteractiveBrowserCredential".to_string()
}

fn default_credential_to() -> String {
    "AzureCliCredential".to_string()
}

fn default_readme_output() -> String {
    "README.md".to_string()
}

fn default_prefix_file() -> String {
    "prefix.md".to_string()
}

fn default_suffix_file() -> String {
    "suffix.md".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_badge_base_url() -> String {
    "https://github.com/Azure/azureml-examples/actions/workflows".to_string()
}

fn default_placeholder() -> String {
    "*no description*".to_string()
}

pub fn default_special_cases() -> Vec<SpecialCase> {
    vec![SpecialCase {
        notebook: "workspace".to_string(),
        substitutions: vec![
            Substitution::new(
                "mlw-basic-prod",
                "mlw-basic-prod-$(echo $RANDOM | md5sum | head -c 10)",
            )
            .with_comment("generate a random workspace name"),
            Substitution::new(
                "ml_client.begin_create_or_update(ws_with_existing)",
                "# ml_client.begin_create_or_update(ws_with_existing)",
            )
            .with_comment("skip other workspace creation commands for now"),
            Substitution::new(
                "ml_client.workspaces.begin_create(ws_private_link)",
                "# ml_client.workspaces.begin_create(ws_private_link)",
            ),
            Substitution::new(
                "ml_client.workspaces.begin_create(ws_private_link)",
                "# ws_from_config = MLClient.from_config()",
            ),
        ],
    }]
}

impl GenerationConfig {
    /// Branch shown on badges: the override, or the fallback when unset.
    pub fn effective_branch<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.branch.trim().is_empty() {
            fallback
        } else {
            self.branch.trim()
        }
    }

    /// The override branch, `None` when unset.
    pub fn branch_override(&self) -> Option<&str> {
        let branch = self.branch.trim();
        (!branch.is_empty()).then_some(branch)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            workflow: WorkflowConfig::default(),
            azure: AzureConfig::default(),
            readme: ReadmeConfig::default(),
            special_cases: default_special_cases(),
        }
    }
}

impl Config {
    /// Substitutions registered for a notebook name, in table order.
    pub fn special_substitutions(&self, notebook_name: &str) -> Vec<&Substitution> {
        self.special_cases
            .iter()
            .filter(|case| case.notebook == notebook_name)
            .flat_map(|case| case.substitutions.iter())
            .collect()
    }

    /// Badge branch for the README table.
    pub fn readme_branch(&self) -> &str {
        self.generation
            .effective_branch(&self.readme.default_branch)
    }

    /// Load configuration from an explicit path, the scan root, or the user
    /// config directory, falling back to defaults.
    pub fn load_with_path(root: &Path, path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        let repo_config = root.join(CONFIG_FILE_NAME);
        if repo_config.is_file() {
            debug!("Loading config from {}", repo_config.display());
            return Self::load_from_path(&repo_config);
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.is_file() {
                debug!("Loading config from {}", user_config.display());
                return Self::load_from_path(&user_config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nbgen").join("config.toml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NbgenError> {
        if self.workflow.prefix.trim().is_empty() {
            return Err(NbgenError::InvalidConfig(
                "workflow.prefix must not be empty".to_string(),
            ));
        }
        if self.workflow.enable_scheduled_runs && self.workflow.cron.trim().is_empty() {
            return Err(NbgenError::InvalidConfig(
                "workflow.cron must be set when scheduled runs are enabled".to_string(),
            ));
        }
        for case in &self.special_cases {
            if case.notebook.trim().is_empty() {
                return Err(NbgenError::InvalidConfig(
                    "special_cases entry has an empty notebook name".to_string(),
                ));
            }
            if case.substitutions.iter().any(|s| s.find.is_empty()) {
                return Err(NbgenError::InvalidConfig(format!(
                    "special case '{}' has a substitution with an empty find pattern",
                    case.notebook
                )));
            }
        }
        Ok(())
    }
}
