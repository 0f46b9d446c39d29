//! State module for tracking a search run
//!
//! # Components
//!
//! - `SearchSession`: the per-search aggregator that page tasks append records to
//! - `PageReport`: the outcome of one page task, collected after the fan-out joins

mod page_report;
mod session;

// Re-export main types
pub use page_report::{PageOutcome, PageReport};
pub use session::SearchSession;
