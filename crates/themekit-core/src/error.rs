use std::path::PathBuf;
use thiserror::Error;

/// Core error type for themekit operations that are not tied to one pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Project root does not exist: {path}")]
    ProjectNotFound { path: PathBuf },
}
