//! Error types for the benchmark pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::runner::Stage;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Error, Debug)]
pub enum BenchError {
    /// A prompt file has no expected answer next to it.
    #[error("No matching answer file found at '{0}'")]
    MissingAnswerFile(PathBuf),

    /// Transport error, non-2xx status or unreadable body from the endpoint.
    #[error("Request failed: {0}")]
    RequestFailure(String),

    /// The evaluator replied with something other than CORRECT or INCORRECT.
    #[error("Ambiguous evaluator verdict: {0:?}")]
    AmbiguousVerdict(String),

    /// The artifact a stage consumes has not been produced yet.
    #[error("{stage} needs '{}', which does not exist. Run the {prerequisite} stage first.", .path.display())]
    MissingArtifact {
        stage: Stage,
        prerequisite: Stage,
        path: PathBuf,
    },

    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error for '{path}': {message}")]
    Serialization { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid prompt pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl BenchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// True when the error means a file was not there, as opposed to unreadable.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::MissingArtifact { .. } | Self::MissingAnswerFile(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        BenchError::RequestFailure(err.to_string())
    }
}
