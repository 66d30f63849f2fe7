use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing column '{column}' in {path:?}")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Invalid value '{value}' for column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Invalid feature size: expected {expected}, got {actual}")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("Unknown movement: {0}")]
    UnknownMovement(String),

    #[error("Classifier not trained")]
    NotTrained,

    #[error("No training examples")]
    EmptyTrainingSet,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
}
