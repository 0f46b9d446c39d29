//! URL handling module for Listing-Harvest
//!
//! This module builds search and page URLs from the configured site and
//! resolves relative links found in listing markup.

mod resolve;
mod search;

// Re-export main functions
pub use resolve::resolve_against;
pub use search::{build_search_url, page_url};
