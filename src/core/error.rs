use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Command failed: {command} (status {status})")]
    CommandFailed { command: String, status: i32 },

    #[error("Failed to launch command: {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{stage} branch failed: {source}")]
    Branch {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Usage(_) => "USAGE_ERROR",
            Error::CommandFailed { .. } => "COMMAND_FAILED",
            Error::Launch { .. } => "LAUNCH_FAILED",
            Error::Io { .. } => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Branch { .. } => "BRANCH_FAILED",
            Error::Other(_) => "ERROR",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
