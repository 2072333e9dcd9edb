use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{Config, Substitution};
use crate::notebook::{Notebook, NOTEBOOK_EXTENSION};
use crate::util::{sed_escape_pattern, sed_escape_replacement, write_if_changed};

/// Indentation of lines inside the `run: |` block.
const RUN_INDENT: &str = "          ";

/// Renders one GitHub Actions workflow per notebook.
pub struct WorkflowRenderer<'a> {
    config: &'a Config,
}

impl<'a> WorkflowRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn workflow_id(&self, notebook: &Notebook) -> String {
        notebook.workflow_id(&self.config.workflow.prefix)
    }

    /// `<output_dir>/<workflow_id>.yml`, resolved against the scan root.
    pub fn output_path(&self, root: &Path, notebook: &Notebook) -> PathBuf {
        root.join(&self.config.workflow.output_dir)
            .join(format!("{}.yml", self.workflow_id(notebook)))
    }

    pub fn render(&self, notebook: &Notebook) -> String {
        let id = self.workflow_id(notebook);
        let mut yaml = format!("name: {}\n", id);
        yaml.push_str(&self.render_triggers(&id));
        yaml.push_str(&self.render_job(notebook));
        yaml
    }

    fn render_triggers(&self, id: &str) -> String {
        let wf = &self.config.workflow;
        let mut out = String::from("on:\n");
        if wf.enable_manual_calling {
            out.push_str("  workflow_dispatch:\n");
        }
        if wf.enable_scheduled_runs {
            out.push_str(&format!("  schedule:\n    - cron: \"{}\"\n", wf.cron));
        }
        out.push_str("  pull_request:\n    branches:\n");
        out.push_str(&format!("      - {}\n", wf.base_branch));
        if let Some(branch) = self.config.generation.branch_override() {
            out.push_str(&format!("      - {}\n", branch));
        }
        out.push_str("    paths:\n");
        out.push_str(&format!("      - {}/**\n", wf.source_dir));
        out.push_str(&format!("      - .github/workflows/{}.yml\n", id));
        out.push_str(&format!("      - {}\n", wf.requirements_file));
        out
    }

    fn render_job(&self, notebook: &Notebook) -> String {
        let wf = &self.config.workflow;
        let mut out = String::from("jobs:\n  build:\n");
        out.push_str(&format!("    runs-on: {}\n", wf.runs_on));
        out.push_str("    steps:\n");

        out.push_str("    - name: check out repo\n      uses: actions/checkout@v2\n");
        if let Some(branch) = self.config.generation.branch_override() {
            out.push_str(&format!("      with:\n        ref: {}\n", branch));
        }

        out.push_str("    - name: setup python\n      uses: actions/setup-python@v2\n");
        out.push_str(&format!("      with:\n        python-version: \"{}\"\n", wf.python_version));
        out.push_str(&format!(
            "    - name: pip install notebook reqs\n      run: pip install -r {}\n",
            wf.requirements_file
        ));
        out.push_str("    - name: azure login\n      uses: azure/login@v1\n");
        out.push_str(&format!("      with:\n        creds: {}\n", wf.creds_secret));

        for step in &wf.setup_steps {
            out.push_str(&format!("    - name: {}\n", step.name));
            out.push_str(&format!("      run: {}\n", step.run));
            out.push_str(&format!("      working-directory: {}\n", step.working_directory));
            out.push_str("      continue-on-error: true\n");
        }

        out.push_str(&self.render_run_step(notebook));
        out
    }

    fn render_run_step(&self, notebook: &Notebook) -> String {
        let wf = &self.config.workflow;
        let file = format!("{}.{}", notebook.name(), NOTEBOOK_EXTENSION);

        let mut out = format!("    - name: run {}\n      run: |\n", notebook.path());
        for substitution in self.placeholder_substitutions() {
            out.push_str(&sed_line(&substitution, &file));
        }

        let special = self.config.special_substitutions(notebook.name());
        if !special.is_empty() {
            debug!("Applying {} extra substitutions to {}", special.len(), notebook);
        }
        for substitution in special {
            if let Some(comment) = &substitution.comment {
                out.push('\n');
                out.push_str(&format!("{}# {}\n", RUN_INDENT, comment));
            }
            out.push_str(&sed_line(substitution, &file));
        }

        out.push('\n');
        out.push_str(&format!("{}papermill {} - -k {}\n", RUN_INDENT, file, wf.kernel));

        let folder = notebook.folder();
        if folder.is_empty() {
            out.push_str(&format!("      working-directory: {}\n", wf.source_dir));
        } else {
            out.push_str(&format!("      working-directory: {}/{}\n", wf.source_dir, folder));
        }
        out
    }

    /// Edits every notebook gets: fill in the workspace coordinates and swap
    /// the interactive credential for the CLI one.
    fn placeholder_substitutions(&self) -> Vec<Substitution> {
        let azure = &self.config.azure;
        vec![
            Substitution::new("<SUBSCRIPTION_ID>", azure.subscription_id.as_str()),
            Substitution::new("<RESOURCE_GROUP>", azure.resource_group.as_str()),
            Substitution::new("<AML_WORKSPACE_NAME>", azure.workspace_name.as_str()),
            Substitution::new(azure.credential_from.as_str(), azure.credential_to.as_str()),
        ]
    }

    /// Write every workflow, returning the files whose content changed.
    /// In dry-run mode nothing is written and the would-be changes are
    /// returned instead.
    pub fn write_all(
        &self,
        root: &Path,
        notebooks: &[Notebook],
        dry_run: bool,
    ) -> Result<Vec<PathBuf>> {
        info!("Writing workflows for {} notebooks", notebooks.len());
        let mut changed = Vec::new();

        for notebook in notebooks {
            let path = self.output_path(root, notebook);
            let yaml = self.render(notebook);

            if dry_run {
                let current = fs::read_to_string(&path).ok();
                if current.as_deref() != Some(yaml.as_str()) {
                    info!("[dry-run] would write {}", path.display());
                    changed.push(path);
                }
                continue;
            }

            if write_if_changed(&path, &yaml)? {
                debug!("Wrote {}", path.display());
                changed.push(path);
            }
        }

        info!(
            "Finished writing workflows ({} changed, {} unchanged)",
            changed.len(),
            notebooks.len() - changed.len()
        );
        Ok(changed)
    }
}

fn sed_line(substitution: &Substitution, file: &str) -> String {
    format!(
        "{}sed -i -e \"s/{}/{}/g\" {}\n",
        RUN_INDENT,
        sed_escape_pattern(&substitution.find),
        sed_escape_replacement(&substitution.replace),
        file
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecialCase;

    #[test]
    fn test_render_default_workflow() {
        let config = Config::default();
        let renderer = WorkflowRenderer::new(&config);
        let nb = Notebook::new("resources/compute/compute.ipynb");

        let expected = r#"name: sdk-resources-compute-compute
on:
  workflow_dispatch:
  schedule:
    - cron: "0 */8 * * *"
  pull_request:
    branches:
      - sdk-preview
    paths:
      - sdk/**
      - .github/workflows/sdk-resources-compute-compute.yml
      - notebooks/dev-requirements.txt
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
    - name: check out repo
      uses: actions/checkout@v2
    - name: setup python
      uses: actions/setup-python@v2
      with:
        python-version: "3.8"
    - name: pip install notebook reqs
      run: pip install -r notebooks/dev-requirements.txt
    - name: azure login
      uses: azure/login@v1
      with:
        creds: ${{secrets.AZ_AE_CREDS}}
    - name: setup SDK
      run: bash setup.sh
      working-directory: sdk
      continue-on-error: true
    - name: setup CLI
      run: bash setup.sh
      working-directory: cli
      continue-on-error: true
    - name: run resources/compute/compute.ipynb
      run: |
          sed -i -e "s/<SUBSCRIPTION_ID>/6560575d-fa06-4e7d-95fb-f962e74efd7a/g" compute.ipynb
          sed -i -e "s/<RESOURCE_GROUP>/azureml-examples-rg/g" compute.ipynb
          sed -i -e "s/<AML_WORKSPACE_NAME>/main/g" compute.ipynb
          sed -i -e "s/InteractiveBrowserCredential/AzureCliCredential/g" compute.ipynb

          papermill compute.ipynb - -k python
      working-directory: sdk/resources/compute
"#;
        assert_eq!(renderer.render(&nb), expected);
    }

    #[test]
    fn test_branch_override_adds_trigger_and_ref() {
        let mut config = Config::default();
        config.generation.branch = "march-sdk-preview".to_string();
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("jobs/train/train.ipynb"));

        assert!(yaml.contains("      - sdk-preview\n      - march-sdk-preview\n    paths:\n"));
        assert!(yaml.contains(
            "      uses: actions/checkout@v2\n      with:\n        ref: march-sdk-preview\n"
        ));
    }

    #[test]
    fn test_triggers_toggle_off() {
        let mut config = Config::default();
        config.workflow.enable_manual_calling = false;
        config.workflow.enable_scheduled_runs = false;
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("a/b/c.ipynb"));

        assert!(!yaml.contains("workflow_dispatch"));
        assert!(!yaml.contains("schedule"));
        assert!(yaml.starts_with("name: sdk-a-b-c\non:\n  pull_request:\n"));
    }

    #[test]
    fn test_workspace_notebook_gets_special_lines() {
        let config = Config::default();
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("resources/workspace/workspace.ipynb"));

        assert!(yaml.contains(
            "\n          # generate a random workspace name\n          sed -i -e \"s/mlw-basic-prod/mlw-basic-prod-$(echo $RANDOM | md5sum | head -c 10)/g\" workspace.ipynb\n"
        ));
        assert!(yaml.contains("# skip other workspace creation commands for now"));
        assert!(yaml.contains(
            "sed -i -e \"s/ml_client.workspaces.begin_create(ws_private_link)/# ml_client.workspaces.begin_create(ws_private_link)/g\" workspace.ipynb\n          sed -i -e \"s/ml_client.workspaces.begin_create(ws_private_link)/# ws_from_config = MLClient.from_config()/g\" workspace.ipynb\n"
        ));
        assert!(!yaml.contains("s/ws_from_config"));
        assert!(yaml.contains("\n\n          papermill workspace.ipynb - -k python\n"));
    }

    #[test]
    fn test_other_notebooks_get_no_special_lines() {
        let config = Config::default();
        let renderer = WorkflowRenderer::new(&config);
        for path in [
            "resources/compute/compute.ipynb",
            "resources/workspace/workspace-advanced.ipynb",
            "workspace/other/notebook.ipynb",
        ] {
            let yaml = renderer.render(&Notebook::new(path));
            assert!(!yaml.contains("mlw-basic-prod"), "{}", path);
            assert!(!yaml.contains('#'), "{}", path);
        }
    }

    #[test]
    fn test_custom_special_case_table() {
        let mut config = Config::default();
        config.special_cases = vec![SpecialCase {
            notebook: "compute".to_string(),
            substitutions: vec![Substitution::new("cpu-cluster", "cpu/cluster-ci")],
        }];
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("resources/compute/compute.ipynb"));

        assert!(yaml.contains("sed -i -e \"s/cpu-cluster/cpu\\/cluster-ci/g\" compute.ipynb\n"));
        assert!(!renderer
            .render(&Notebook::new("resources/workspace/workspace.ipynb"))
            .contains("mlw-basic-prod"));
    }

    #[test]
    fn test_replacement_values_are_literal() {
        let mut config = Config::default();
        config.azure.resource_group = "rg&prod".to_string();
        config.azure.workspace_name = "ws\\main".to_string();
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("resources/compute/compute.ipynb"));

        assert!(yaml.contains("sed -i -e \"s/<RESOURCE_GROUP>/rg\\&prod/g\" compute.ipynb\n"));
        assert!(yaml.contains(
            "sed -i -e \"s/<AML_WORKSPACE_NAME>/ws\\\\\\\\main/g\" compute.ipynb\n"
        ));
    }

    #[test]
    fn test_root_level_notebook() {
        let config = Config::default();
        let renderer = WorkflowRenderer::new(&config);
        let yaml = renderer.render(&Notebook::new("intro.ipynb"));
        assert!(yaml.starts_with("name: sdk-intro\n"));
        assert!(yaml.ends_with("      working-directory: sdk\n"));
    }

    #[test]
    fn test_output_path() {
        let config = Config::default();
        let renderer = WorkflowRenderer::new(&config);
        let path = renderer.output_path(
            Path::new("/repo/sdk"),
            &Notebook::new("jobs/pipelines/1a/pipeline.ipynb"),
        );
        assert_eq!(
            path,
            Path::new("/repo/sdk/../.github/workflows/sdk-jobs-pipelines-1a-pipeline.yml")
        );
    }
}
