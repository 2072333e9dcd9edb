use std::path::PathBuf;

use thiserror::Error;

/// Failures that need a dedicated exit code. Everything else travels as a
/// plain `anyhow::Error` and exits with status 1.
#[derive(Debug, Error)]
pub enum NbgenError {
    #[error("{os} is not supported, nbgen only runs on POSIX platforms")]
    UnsupportedPlatform { os: &'static str },

    #[error("{} is out of date, run `nbgen generate` to refresh it", path.display())]
    ReadmeOutOfDate { path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NbgenError {
    pub fn exit_code(&self) -> u8 {
        match self {
            NbgenError::InvalidConfig(_) => 1,
            NbgenError::UnsupportedPlatform { .. } => 2,
            NbgenError::ReadmeOutOfDate { .. } => 3,
        }
    }
}

/// Exit code for an arbitrary error coming out of a command.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<NbgenError>()
        .map_or(1, NbgenError::exit_code)
}
