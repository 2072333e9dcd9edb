use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::pipeline::generator::Generator;

/// Print `<workflow_id>\t<path>` for every discovered notebook.
pub fn run(path: &str, config_path: Option<String>) -> Result<()> {
    for line in lines(path, config_path)? {
        println!("{}", line);
    }
    Ok(())
}

fn lines(path: &str, config_path: Option<String>) -> Result<Vec<String>> {
    let root = Path::new(path);
    let config = Config::load_with_path(root, config_path)?;
    let generator = Generator::new(root, config);
    let prefix = &generator.config().workflow.prefix;
    Ok(generator
        .discover()?
        .iter()
        .map(|nb| format!("{}\t{}", nb.workflow_id(prefix), nb.path()))
        .collect())
}
