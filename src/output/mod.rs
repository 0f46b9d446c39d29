//! Output module for emitting harvested records
//!
//! This module handles:
//! - Serializing records as a JSON array
//! - Writing the array to its destination once per run
//! - Summarizing the run

mod json;
pub mod stats;
mod traits;

pub use json::{default_output_path, parse_records, serialize_records, JsonFileOutput};
pub use stats::{print_summary, RunSummary};
pub use traits::{OutputError, OutputHandler, OutputResult};
