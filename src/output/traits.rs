//! Output handler traits and types
//!
//! This module defines the trait interface for record sinks.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A destination for the records of a finished run
///
/// Records are written once, at the end of a run, with whatever was gathered.
pub trait OutputHandler {
    /// Writes the full record collection
    fn write_records(&self, records: &[Record]) -> OutputResult<()>;

    /// Human-readable name of the destination, for logging
    fn describe(&self) -> String;
}

impl From<OutputError> for crate::HarvestError {
    fn from(error: OutputError) -> Self {
        match error {
            OutputError::Serialize(e) => crate::HarvestError::Json(e),
            OutputError::Io(e) => crate::HarvestError::Io(e),
        }
    }
}
