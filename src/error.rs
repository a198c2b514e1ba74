use std::path::PathBuf;
use thiserror::Error;

/// Error types for the preprocessing pipeline
///
/// Variants fall into three families:
/// - load errors abort a whole dataset and produce no records
/// - record errors are isolated to one record and only counted
/// - persist errors are returned to the caller without discarding in-memory results
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Dataset file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to decode {} as {encoding}: {reason}", path.display())]
    Encoding {
        path: PathBuf,
        encoding: String,
        reason: String,
    },

    #[error("Malformed JSON in {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected JSON shape in {}: {reason}", path.display())]
    InvalidJsonShape { path: PathBuf, reason: String },

    #[error("Normalization failed: {0}")]
    Normalization(String),

    #[error("Record {index} failed: {reason}")]
    Record { index: usize, reason: String },

    #[error("Failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Processing cancelled after {consumed} of {total} records")]
    Cancelled { consumed: usize, total: usize },

    #[error("Run ended before producing output")]
    IncompleteRun,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessingError {
    /// Errors that abort a dataset before any record is processed.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::FileNotFound(_)
                | ProcessingError::Encoding { .. }
                | ProcessingError::MalformedJson { .. }
                | ProcessingError::InvalidJsonShape { .. }
                | ProcessingError::Io(_)
        )
    }

    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::Normalization(_) | ProcessingError::Record { .. }
        )
    }

    pub fn is_persist_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::Persist { .. }
                | ProcessingError::Csv { .. }
                | ProcessingError::Serialization(_)
        )
    }
}
