// src/utils/error.rs
use thiserror::Error;

/// Errors surfaced by the readers.
///
/// `DataUnavailable` is a legitimate empty result (the page simply has no such
/// section for this entity); everything else is an operational failure.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("No entity found for identifier '{0}'")]
    NotFound(String),

    #[error("Data not available: {0}")]
    DataUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),
}

impl ReaderError {
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, ReaderError::DataUnavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("HTML parsing error: {0}")]
    HtmlParseError(String),
}

impl From<ExtractError> for ReaderError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::SectionNotFound(msg) => ReaderError::DataUnavailable(msg),
            ExtractError::HtmlParseError(msg) => ReaderError::Parse(msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reader failed: {0}")]
    Reader(#[from] ReaderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
