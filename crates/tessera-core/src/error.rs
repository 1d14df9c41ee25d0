use std::path::PathBuf;
use thiserror::Error;

/// Failure while discovering or parsing prompt patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pattern document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("pattern document {} has no `name`", path.display())]
    MissingName { path: PathBuf },

    #[error("pattern document {} has no `template`", path.display())]
    MissingTemplate { path: PathBuf },

    #[error("pattern `{name}` is declared by more than one document")]
    DuplicateName { name: String },
}

/// A request's raw settings could not be turned into a generation configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("invalid value {value:?} for `{field}`: expected {expected}")]
    Configuration {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("unknown setting `{field}`")]
    UnknownField { field: String },

    #[error("unknown prompt pattern `{name}`")]
    UnknownPattern { name: String },
}

/// A live model handle could not be constructed. Always absorbed by the model session.
#[derive(Debug, Clone, Error)]
pub enum ModelLoadError {
    #[error("backend plugin unavailable: {0}")]
    Plugin(String),

    #[error("backend refused model: {0}")]
    Backend(String),

    #[error("invalid model path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("backend panicked during inference")]
    Panicked,

    #[error("no model has been initialized")]
    Uninitialized,
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
