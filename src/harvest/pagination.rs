//! Page-count detection and page URL planning

use crate::config::{parse_selector, MarkupProfile};
use crate::url::page_url;
use crate::ConfigError;
use scraper::{Html, Selector};
use url::Url;

/// Hard upper bound on the page count read from a results page
pub const PAGE_COUNT_CEILING: u32 = 400;

/// One results page to fetch and extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    /// 1-based page number
    pub page: u32,
    pub url: String,
}

/// The work derived from the first results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePlan {
    /// Only one page exists; the first page already fetched is the whole result
    FirstPageOnly { url: String },
    /// Every page, page 1 included, is fetched again with an explicit page parameter
    Pages(Vec<PageTask>),
}

impl PagePlan {
    pub fn page_count(&self) -> u32 {
        match self {
            Self::FirstPageOnly { .. } => 1,
            Self::Pages(tasks) => tasks.last().map_or(0, |task| task.page),
        }
    }

    #[cfg(test)]
    fn urls(&self) -> Vec<String> {
        match self {
            Self::FirstPageOnly { url } => vec![url.clone()],
            Self::Pages(tasks) => tasks.iter().map(|task| task.url.clone()).collect(),
        }
    }
}

/// Reads the pagination control of a results page
#[derive(Debug)]
pub struct PaginationPlanner {
    current_page: Selector,
    page_button: Selector,
    max_pages: Option<u32>,
}

impl PaginationPlanner {
    /// Creates a planner; `max_pages` caps the detected page count
    pub fn new(profile: &MarkupProfile, max_pages: Option<u32>) -> Result<Self, ConfigError> {
        Ok(Self {
            current_page: parse_selector("current-page", &profile.current_page)?,
            page_button: parse_selector("page-button", &profile.page_button)?,
            max_pages,
        })
    }

    /// Detects the total number of result pages
    ///
    /// The disabled pagination item carries the last page number when the
    /// control is truncated; otherwise the last numbered page button does.
    /// Items whose text is not a page number (such as a disabled "Previous")
    /// are skipped. Without any numbered item the result has a single page.
    /// Counts above [`PAGE_COUNT_CEILING`] are clamped to it.
    pub fn page_count(&self, page_html: &str) -> u32 {
        let document = Html::parse_document(page_html);

        let count = last_page_number(&document, &self.current_page)
            .or_else(|| last_page_number(&document, &self.page_button))
            .unwrap_or(1)
            .max(1);

        if count > PAGE_COUNT_CEILING {
            tracing::warn!(
                "Pagination reports {} pages, clamping to {}",
                count,
                PAGE_COUNT_CEILING
            );
            return PAGE_COUNT_CEILING;
        }
        count
    }

    /// Plans the page URLs for a search from its first results page
    pub fn plan_pages(&self, first_page_html: &str, search_url: &Url) -> PagePlan {
        let mut count = self.page_count(first_page_html);
        if let Some(max_pages) = self.max_pages {
            if count > max_pages {
                tracing::info!("Capping {} result pages to {}", count, max_pages);
                count = max_pages;
            }
        }

        if count <= 1 {
            return PagePlan::FirstPageOnly {
                url: search_url.to_string(),
            };
        }

        PagePlan::Pages(
            (1..=count)
                .map(|page| PageTask {
                    page,
                    url: page_url(search_url, page),
                })
                .collect(),
        )
    }
}

fn last_page_number(document: &Html, selector: &Selector) -> Option<u32> {
    document
        .select(selector)
        .filter_map(|item| item.text().collect::<String>().trim().parse::<u32>().ok())
        .last()
}
