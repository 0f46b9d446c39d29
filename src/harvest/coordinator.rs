//! Harvest coordinator - search orchestration logic
//!
//! This module ties the pipeline together for one search:
//! - Fetching and validating the first results page
//! - Planning the page URLs from its pagination control
//! - Fanning page tasks out over the worker pool
//! - Extracting records, including detail-page fetches, inside each task
//! - Joining every task and summarizing the run

use crate::config::{validate, Config};
use crate::harvest::extractor::{ListingExtractor, MarkupExtractor};
use crate::harvest::fetcher::PageFetcher;
use crate::harvest::pagination::{PagePlan, PageTask, PaginationPlanner};
use crate::harvest::scheduler::WorkerPool;
use crate::harvest::validator::PageValidator;
use crate::output::RunSummary;
use crate::record::{DetailFields, Record};
use crate::state::{PageOutcome, PageReport, SearchSession};
use crate::url::build_search_url;
use crate::HarvestError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Records and statistics of a finished search
#[derive(Debug)]
pub struct SearchOutcome {
    pub records: Vec<Record>,
    pub summary: RunSummary,
}

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    planner: PaginationPlanner,
    pool: WorkerPool,
}

/// Everything a page task needs; cheap to clone into each task
#[derive(Clone)]
struct PageContext {
    fetcher: Arc<PageFetcher>,
    extractor: Arc<dyn ListingExtractor>,
    session: Arc<SearchSession>,
    detail_pages: bool,
}

impl Coordinator {
    /// Creates a coordinator using the markup profile from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run searches
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.search.base_url)?;
        let extractor = MarkupExtractor::new(&config.markup, base_url)?;
        Self::with_extractor(config, Arc::new(extractor))
    }

    /// Creates a coordinator with a custom extraction strategy
    pub fn with_extractor(
        config: Config,
        extractor: Arc<dyn ListingExtractor>,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        let validator = PageValidator::from_rules(&config.soft_failure);
        let fetcher = PageFetcher::new(&config.fetch, validator)?;
        let planner = PaginationPlanner::new(&config.markup, config.search.max_pages)?;
        let pool = WorkerPool::new(config.concurrency.max_workers);

        Ok(Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            extractor,
            planner,
            pool,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Runs one search end to end
    ///
    /// The run only fails outright on an unusable search term. A first page
    /// that cannot be fetched yields an empty record list with a failed page
    /// report; failed later pages leave the other pages' records intact.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, HarvestError> {
        let started_at = Utc::now();
        let search_url = build_search_url(&self.config.search, term)?;
        let session = Arc::new(SearchSession::new(term.trim()));

        tracing::info!("Searching '{}' via {}", session.term(), search_url);

        let reports = match self.fetcher.fetch(search_url.as_str()).await {
            Ok(first_page) => {
                let plan = self.planner.plan_pages(&first_page, &search_url);
                session.set_page_count(plan.page_count());

                match plan {
                    PagePlan::FirstPageOnly { url } => {
                        tracing::info!("Single result page");
                        let ctx = self.page_context(&session);
                        let records = harvest_listing(&ctx, &first_page).await;
                        vec![PageReport::new(1, url, PageOutcome::Harvested { records })]
                    }
                    PagePlan::Pages(tasks) => {
                        tracing::info!(
                            "Processing {} pages with {} workers",
                            tasks.len(),
                            self.pool.size()
                        );
                        self.harvest_pages(&session, tasks).await
                    }
                }
            }
            Err(e) => {
                tracing::error!("First results page unavailable: {}", e);
                vec![PageReport::new(
                    1,
                    search_url.to_string(),
                    PageOutcome::from_error(&e),
                )]
            }
        };

        let records = session.take_records();
        tracing::debug!(
            "{} record blocks seen, {} records kept",
            session.items_seen(),
            records.len()
        );
        let summary = RunSummary::new(
            session.term(),
            started_at,
            session.page_count(),
            records.len(),
            reports,
        );

        Ok(SearchOutcome { records, summary })
    }

    /// Fetches and extracts every page task concurrently
    ///
    /// All tasks are spawned onto a `JoinSet` and each waits for a worker slot.
    /// Every task is joined and reported. A permanently failed page does not
    /// affect the others unless `abort-on-page-failure` is set, in which case
    /// the remaining tasks are cancelled and reported as aborted.
    pub async fn harvest_pages(
        &self,
        session: &Arc<SearchSession>,
        tasks: Vec<PageTask>,
    ) -> Vec<PageReport> {
        let ctx = self.page_context(session);
        let abort_on_failure = self.config.run.abort_on_page_failure;

        let mut pending: BTreeMap<u32, String> = tasks
            .iter()
            .map(|task| (task.page, task.url.clone()))
            .collect();

        let mut join_set = JoinSet::new();
        for task in tasks {
            let ctx = ctx.clone();
            let pool = self.pool.clone();
            join_set.spawn(async move {
                let _permit = pool.acquire().await;
                run_page_task(ctx, task).await
            });
        }

        let mut reports = Vec::with_capacity(pending.len());
        let mut aborting = false;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => {
                    pending.remove(&report.page);
                    if report.outcome.is_failure() && abort_on_failure && !aborting {
                        tracing::warn!(
                            "Page {} failed permanently, aborting the remaining pages",
                            report.page
                        );
                        join_set.abort_all();
                        aborting = true;
                    }
                    reports.push(report);
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!("Page task panicked: {}", e),
            }
        }

        for (page, url) in pending {
            let outcome = if aborting {
                PageOutcome::Aborted
            } else {
                PageOutcome::Crashed {
                    error: "page task panicked".to_string(),
                }
            };
            reports.push(PageReport::new(page, url, outcome));
        }

        reports.sort_by_key(|report| report.page);
        reports
    }

    fn page_context(&self, session: &Arc<SearchSession>) -> PageContext {
        PageContext {
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            session: Arc::clone(session),
            detail_pages: self.config.run.detail_pages,
        }
    }
}

/// Fetches one results page and extracts its records
async fn run_page_task(ctx: PageContext, task: PageTask) -> PageReport {
    tracing::info!("Processing page {}: {}", task.page, task.url);

    match ctx.fetcher.fetch(&task.url).await {
        Ok(page_html) => {
            let records = harvest_listing(&ctx, &page_html).await;
            tracing::debug!("Page {} yielded {} records", task.page, records);
            PageReport::new(task.page, task.url, PageOutcome::Harvested { records })
        }
        Err(e) => {
            tracing::error!("Page {} permanently failed: {}", task.page, e);
            let outcome = PageOutcome::from_error(&e);
            PageReport::new(task.page, task.url, outcome)
        }
    }
}

/// Extracts every record block of a fetched page, appending to the session
///
/// Records are processed one after another; each detail-page fetch happens
/// inside this loop.
async fn harvest_listing(ctx: &PageContext, page_html: &str) -> usize {
    let blocks = ctx.extractor.find_record_blocks(page_html);
    let mut harvested = 0;

    for block in blocks {
        let item = ctx.session.next_item_number();
        tracing::info!("Scraping product {}", item);

        let listing = ctx.extractor.extract(&block);
        let detail = fetch_detail(ctx, &listing.source_url).await;

        ctx.session.append(Record::assemble(listing, detail));
        harvested += 1;
    }

    harvested
}

/// Brand and description from the detail page; empty on any failure
async fn fetch_detail(ctx: &PageContext, url: &str) -> DetailFields {
    if !ctx.detail_pages || url.is_empty() {
        return DetailFields::default();
    }

    match ctx.fetcher.fetch(url).await {
        Ok(detail_html) => ctx.extractor.extract_detail(&detail_html),
        Err(e) => {
            tracing::warn!("Detail page unavailable for {}: {}", url, e);
            DetailFields::default()
        }
    }
}
