//! JSON array output

use crate::output::traits::{OutputHandler, OutputResult};
use crate::record::Record;
use std::path::{Path, PathBuf};

/// Serializes records as a JSON array of flat objects
///
/// Every field is present in every object; absent optionals are `null`.
///
/// # Example
///
/// ```
/// use listing_harvest::output::serialize_records;
///
/// assert_eq!(serialize_records(&[]).unwrap(), "[]");
/// ```
pub fn serialize_records(records: &[Record]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Parses a JSON array previously produced by [`serialize_records`]
pub fn parse_records(json: &str) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Writes the record array to a file
#[derive(Debug, Clone)]
pub struct JsonFileOutput {
    path: PathBuf,
}

impl JsonFileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for JsonFileOutput {
    fn write_records(&self, records: &[Record]) -> OutputResult<()> {
        let json = serialize_records(records)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.path, json)?;
        tracing::info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

/// Default output file name for a search term: spaces become underscores
pub fn default_output_path(term: &str) -> PathBuf {
    let stem: String = term
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect();
    PathBuf::from(format!("{}.json", stem))
}
