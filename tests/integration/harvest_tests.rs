//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the storefront and run whole
//! searches end-to-end: first page, pagination fan-out, retries and
//! detail-page fetches.

use listing_harvest::config::{Config, FetchStrategy};
use listing_harvest::harvest::Coordinator;
use listing_harvest::output::{parse_records, JsonFileOutput, OutputHandler};
use listing_harvest::state::PageOutcome;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const BOT_CHECK: &str = r#"<html><body><h4>Sorry, we just need to make sure you're not a robot.</h4></body></html>"#;

const NO_RESULTS: &str = r#"<html><body><div>No results for your query. Try checking your spelling or use more general terms</div></body></html>"#;

/// Matches the unpaginated first request of a search
struct WithoutPageParam;

impl Match for WithoutPageParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "page")
    }
}

/// Creates a test configuration pointed at the mock server, without retry delays
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::for_site(base_url);
    config.fetch.retry_delay_secs = 0;
    config.fetch.max_attempts = 2;
    config.fetch.timeout_secs = 5;
    config.concurrency.max_workers = 4;
    config
}

/// One search-result block in the listing markup
fn record_block(id: &str, price: &str) -> String {
    format!(
        r#"<div data-component-type="s-search-result" data-asin="{id}">
             <div class="s-image"><img src="https://img.example.com/{id}.jpg"></div>
             <h2><a class="a-link-normal s-underline-text s-underline-link-text s-link-style a-text-normal" href="/dp/{id}">
               <span class="a-size-medium a-color-base a-text-normal">Item {id}</span>
             </a></h2>
             <span class="a-icon-alt">4.5 out of 5 stars</span>
             <span class="a-size-base">1,234 ratings</span>
             <span class="a-price"><span class="a-offscreen">{price}</span></span>
           </div>"#
    )
}

/// A results page holding the given blocks; `last_page` above 1 adds a pagination strip
fn listing_page(blocks: &[String], last_page: u32) -> String {
    let pagination = if last_page > 1 {
        format!(
            r#"<span class="s-pagination-strip">
                 <span class="s-pagination-item s-pagination-selected">1</span>
                 <a class="s-pagination-item s-pagination-button" href="/s?page=2">2</a>
                 <span class="s-pagination-item s-pagination-ellipsis">...</span>
                 <span class="s-pagination-item s-pagination-disabled">{last_page}</span>
               </span>"#
        )
    } else {
        String::new()
    };

    format!(
        "<html><head><title>Results</title></head><body><div class=\"s-main-slot\">{}</div>{}</body></html>",
        blocks.concat(),
        pagination
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_full_search_single_page() {
    let mock_server = MockServer::start().await;

    let page = listing_page(
        &[record_block("A1", "$24.99"), record_block("A2", "$1,299.00")],
        1,
    );
    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("k", "desk lamp"))
        .respond_with(html(page))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Brand table and "About this item" bullets
    Mock::given(method("GET"))
        .and(path("/dp/A1"))
        .respond_with(html(
            r#"<html><body>
                 <table><tr class="po-brand"><td>Brand</td><td><span>Lumen</span></td></tr></table>
                 <div id="about"><h1>About this item</h1>
                   <ul><li> Dimmable   LED </li><li></li><li>USB charging port</li></ul>
                 </div>
               </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    // No detail page for the second item
    Mock::given(method("GET"))
        .and(path("/dp/A2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator
        .search("  desk lamp ")
        .await
        .expect("Search failed");

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.summary.page_count, 1);
    assert_eq!(outcome.summary.reports.len(), 1);
    assert_eq!(
        outcome.summary.reports[0].outcome,
        PageOutcome::Harvested { records: 2 }
    );

    let first = outcome
        .records
        .iter()
        .find(|record| record.external_id == "A1")
        .expect("A1 harvested");
    assert_eq!(first.source_url, format!("{}/dp/A1", mock_server.uri()));
    assert_eq!(first.title, "Item A1");
    assert_eq!(first.price, Some(24.99));
    assert_eq!(first.rating_stars, Some(4.5));
    assert_eq!(first.review_count, Some(1234));
    assert_eq!(first.image_url, "https://img.example.com/A1.jpg");
    assert_eq!(first.brand, "Lumen");
    assert_eq!(first.description, "Dimmable LED\nUSB charging port");

    let second = outcome
        .records
        .iter()
        .find(|record| record.external_id == "A2")
        .expect("A2 harvested");
    assert_eq!(second.price, Some(1299.0));
    assert!(second.brand.is_empty());
    assert!(second.description.is_empty());
}

#[tokio::test]
async fn test_multi_page_search_isolates_failed_pages() {
    let mock_server = MockServer::start().await;
    let last_page = 10;
    let blocked = [4, 6, 8];

    let page_blocks = |page: u32| {
        vec![
            record_block(&format!("P{page}A"), "$10.00"),
            record_block(&format!("P{page}B"), "$12.50"),
        ]
    };

    Mock::given(method("GET"))
        .and(path("/s"))
        .and(WithoutPageParam)
        .respond_with(html(listing_page(&page_blocks(1), last_page)))
        .expect(1)
        .mount(&mock_server)
        .await;

    for page in 1..=last_page {
        let mock = Mock::given(method("GET"))
            .and(path("/s"))
            .and(query_param("page", page.to_string()));

        if blocked.contains(&page) {
            // Retried exactly up to max-attempts
            mock.respond_with(html(BOT_CHECK))
                .expect(2)
                .mount(&mock_server)
                .await;
        } else {
            mock.respond_with(html(listing_page(&page_blocks(page), last_page)))
                .expect(1)
                .mount(&mock_server)
                .await;
        }
    }

    let mut config = create_test_config(&mock_server.uri());
    config.run.detail_pages = false;

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.search("kettle").await.expect("Search failed");

    assert_eq!(outcome.summary.page_count, 10);
    assert_eq!(outcome.summary.reports.len(), 10);
    assert_eq!(outcome.summary.pages_harvested(), 7);
    assert_eq!(outcome.summary.pages_failed(), 3);
    assert_eq!(outcome.records.len(), 14);
    assert_eq!(outcome.summary.record_count, 14);

    let failed: Vec<u32> = outcome
        .summary
        .failed_reports()
        .map(|report| report.page)
        .collect();
    assert_eq!(failed, blocked.to_vec());

    for report in outcome.summary.failed_reports() {
        assert!(matches!(report.outcome, PageOutcome::Exhausted { .. }));
        assert!(report.outcome.error().unwrap().contains("bot check page"));
    }

    // Every record of a healthy page is present, none from a blocked one
    for page in 1..=last_page {
        let present = outcome
            .records
            .iter()
            .filter(|record| record.external_id.starts_with(&format!("P{page}A")))
            .count();
        let expected = if blocked.contains(&page) { 0 } else { 1 };
        assert_eq!(present, expected, "records for page {}", page);
    }
}

#[tokio::test]
async fn test_transport_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetch.max_attempts = 5;

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.search("kettle").await.expect("Search failed");

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.summary.reports.len(), 1);

    let report = &outcome.summary.reports[0];
    assert_eq!(report.page, 1);
    assert!(matches!(report.outcome, PageOutcome::Unavailable { .. }));
    assert!(report.outcome.error().unwrap().contains("503"));
}

#[tokio::test]
async fn test_soft_failure_retried_up_to_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(html(NO_RESULTS))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetch.max_attempts = 3;

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator
        .search("zzqxv")
        .await
        .expect("Search failed");

    assert!(outcome.records.is_empty());
    let report = &outcome.summary.reports[0];
    assert!(matches!(report.outcome, PageOutcome::Exhausted { .. }));
    assert!(report.outcome.error().unwrap().contains("no results page"));
}

#[tokio::test]
async fn test_soft_failure_recovers_on_retry() {
    let mock_server = MockServer::start().await;

    // First answer is a bot check, then the real page
    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(html(BOT_CHECK))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(html(listing_page(&[record_block("R1", "$5.00")], 1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.run.detail_pages = false;

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.search("kettle").await.expect("Search failed");

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].external_id, "R1");
}

#[tokio::test]
async fn test_proxy_strategy_forwards_target_url() {
    let mock_server = MockServer::start().await;
    let site = "https://shop.example.com";

    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("url", format!("{}/s?k=desk+lamp", site)))
        .respond_with(html(listing_page(&[record_block("X1", "$7.49")], 1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("api_key", "secret-key"))
        .and(query_param("url", format!("{}/dp/X1", site)))
        .respond_with(html(
            r#"<html><body><a id="bylineInfo" href="/stores/acme">Brand: Acme</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(site);
    config.fetch.strategy = FetchStrategy::Proxy;
    config.fetch.proxy_endpoint = Some(format!("{}/proxy", mock_server.uri()));
    config.fetch.proxy_api_key = Some("secret-key".to_string());

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator
        .search("desk lamp")
        .await
        .expect("Search failed");

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.source_url, "https://shop.example.com/dp/X1");
    assert_eq!(record.brand, "Acme");
    assert_eq!(record.price, Some(7.49));
}

#[tokio::test]
async fn test_abort_on_page_failure_cancels_remaining_pages() {
    let mock_server = MockServer::start().await;
    let last_page = 5;

    Mock::given(method("GET"))
        .and(path("/s"))
        .and(WithoutPageParam)
        .respond_with(html(listing_page(&[record_block("F1", "$3.00")], last_page)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("page", "1"))
        .respond_with(html(listing_page(&[record_block("F1", "$3.00")], last_page)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    for page in 3..=last_page {
        Mock::given(method("GET"))
            .and(path("/s"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                html(listing_page(&[record_block(&format!("L{page}"), "$3.00")], last_page))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&mock_server.uri());
    config.concurrency.max_workers = 1;
    config.run.detail_pages = false;
    config.run.abort_on_page_failure = true;

    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.search("kettle").await.expect("Search failed");

    assert_eq!(outcome.summary.reports.len(), 5);
    assert_eq!(outcome.summary.pages_failed(), 1);
    assert_eq!(outcome.summary.pages_aborted(), 3);
    assert!(matches!(
        outcome.summary.reports[1].outcome,
        PageOutcome::Unavailable { .. }
    ));

    // Records gathered before the abort are kept
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].external_id, "F1");
}

#[tokio::test]
async fn test_empty_results_write_empty_array() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/s"))
        .respond_with(html(listing_page(&[], 1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let outcome = coordinator.search("nothing").await.expect("Search failed");

    assert!(outcome.records.is_empty());
    assert_eq!(
        outcome.summary.reports[0].outcome,
        PageOutcome::Harvested { records: 0 }
    );

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = dir.path().join("nothing.json");
    JsonFileOutput::new(&output_path)
        .write_records(&outcome.records)
        .expect("Failed to write output");

    let written = std::fs::read_to_string(&output_path).expect("Failed to read output");
    assert_eq!(written, "[]");
    assert!(parse_records(&written).unwrap().is_empty());
}
