use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Suite not found: {0}")]
    SuiteNotFound(String),

    #[error("Result document not found for suite: {0}")]
    ResultsNotFound(String),

    #[error("Invalid suite id: {0:?}")]
    InvalidId(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the variants that mean "the document does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::SuiteNotFound(_) | StorageError::ResultsNotFound(_)
        )
    }
}
