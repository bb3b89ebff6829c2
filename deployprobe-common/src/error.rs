use std::path::PathBuf;

use thiserror::Error;

/// Main error type for deployprobe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote execution error: {0}")]
    Remote(String),

    #[error("Refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),
}

impl From<toml::ser::Error> for ProbeError {
    fn from(error: toml::ser::Error) -> Self {
        ProbeError::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(error: serde_json::Error) -> Self {
        ProbeError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
