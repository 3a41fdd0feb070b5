use std::path::PathBuf;

use cura_core::CurationError;
use thiserror::Error;

use crate::{pipeline::Stage, tools::ToolError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Paths(#[from] cura_paths::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error(transparent)]
    Paths(#[from] cura_paths::Error),

    #[error("the catalog connection lock is poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Curation(#[from] CurationError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot derive an identity from {0}")]
    InvalidFileName(PathBuf),

    #[error("media attribute `{0}` is missing and could not be recovered")]
    MissingAttribute(&'static str),

    #[error("duration {actual:.0}s is below the minimum of {minimum}s")]
    TooShort { actual: f64, minimum: u64 },

    #[error("cannot move {path}: {source}")]
    Relocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not inside the `{stage}` stage directory")]
    NotInStage { path: PathBuf, stage: String },

    #[error("{0} is not cataloged")]
    NotCataloged(String),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Fallo de un archivo y la etapa a la que llegó.
#[derive(Error, Debug)]
#[error("{path} stopped at {stage}: {error}")]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}
