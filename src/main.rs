use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use nbgen::{cli, error::exit_code_for, util};

#[derive(Parser)]
#[command(name = "nbgen", version)]
#[command(about = "Generate CI workflows and a README status table for notebooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one workflow per notebook and the README status table
    Generate {
        /// Directory to scan (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Path to config file (defaults to ./nbgen.toml or ~/.config/nbgen/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Release-candidate branch; pass an empty string to clear the configured one
        #[arg(long)]
        branch: Option<String>,

        /// Only write workflows (combine with --readme for both)
        #[arg(long)]
        workflows: bool,

        /// Only write the README (combine with --workflows for both)
        #[arg(long)]
        readme: bool,

        /// Fail if the README is not up to date instead of writing it
        #[arg(long)]
        check_readme: bool,

        /// Skip notebooks listed in generation.excluded_notebooks
        #[arg(long)]
        apply_exclusions: bool,

        /// Render everything but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// List discovered notebooks and their workflow ids
    List {
        #[arg(default_value = ".")]
        path: String,

        #[arg(long)]
        config: Option<String>,
    },

    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = util::ensure_posix() {
        warn!("{}", err);
        return ExitCode::from(err.exit_code());
    }

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            path,
            config,
            branch,
            workflows,
            readme,
            check_readme,
            apply_exclusions,
            dry_run,
        } => {
            cli::generate::run(
                path,
                config,
                branch,
                workflows,
                readme,
                check_readme,
                apply_exclusions,
                dry_run,
            )?;
        }
        Commands::List { path, config } => cli::list::run(&path, config)?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "nbgen", &mut io::stdout());
        }
    }

    Ok(())
}
