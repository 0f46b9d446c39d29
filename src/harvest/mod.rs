//! Harvest module: the fetch-validate-retry-parse pipeline
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry on soft-failure pages
//! - Soft-failure page classification
//! - Record extraction from listing and detail markup
//! - Page-count detection and page planning
//! - Bounded fan-out of page tasks

mod coordinator;
mod extractor;
mod fetcher;
mod pagination;
mod scheduler;
mod validator;

pub use coordinator::{Coordinator, SearchOutcome};
pub use extractor::{
    parse_price, parse_rating, parse_review_count, ListingExtractor, MarkupExtractor,
};
pub use fetcher::{build_http_client, FetchResult, PageFetcher};
pub use pagination::{PagePlan, PageTask, PaginationPlanner, PAGE_COUNT_CEILING};
pub use scheduler::{resolve_worker_count, WorkerPool};
pub use validator::{PageValidator, Verdict};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete search
///
/// This is the main entry point for a harvest. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Fetch the first results page and plan the remaining pages
/// 3. Fetch and extract every page on the worker pool
/// 4. Return the gathered records with a run summary
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::load_config;
/// use listing_harvest::harvest::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let outcome = harvest(config, "desk lamp").await?;
/// println!("{} records", outcome.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: Config, term: &str) -> Result<SearchOutcome, HarvestError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.search(term).await
}
