use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub markup: MarkupProfile,
    /// Ordered soft-failure rules; empty means the built-in rule set
    #[serde(default, rename = "soft-failure")]
    pub soft_failure: Vec<SoftFailureRule>,
}

impl Config {
    /// Builds a configuration for `base_url` with every other setting at its default
    pub fn for_site(base_url: &str) -> Self {
        Self {
            search: SearchConfig {
                base_url: base_url.to_string(),
                search_path: default_search_path(),
                query_param: default_query_param(),
                max_pages: None,
            },
            fetch: FetchConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            run: RunConfig::default(),
            markup: MarkupProfile::default(),
            soft_failure: Vec::new(),
        }
    }
}

/// Where and how to search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Site origin; product links are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the search endpoint
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// Query parameter carrying the search term
    #[serde(rename = "query-param", default = "default_query_param")]
    pub query_param: String,

    /// Upper bound on the number of result pages to harvest
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

fn default_search_path() -> String {
    "/s".to_string()
}

fn default_query_param() -> String {
    "k".to_string()
}

/// How pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// GET the site directly with a cookie session and rotating user agents
    Direct,
    /// GET through a third-party fetch proxy that performs the request for us
    Proxy,
}

/// Fetching and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    pub strategy: FetchStrategy,

    /// Attempts per URL before a page is given up on
    pub max_attempts: u32,

    /// Delay before retrying after a soft-failure page (seconds)
    pub retry_delay_secs: u64,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Upper bound of the random pause before each direct request (milliseconds)
    pub jitter_ms: u64,

    /// User agents rotated across direct requests
    pub user_agents: Vec<String>,

    /// Fetch-proxy endpoint, required by the proxy strategy
    pub proxy_endpoint: Option<String>,

    /// Fetch-proxy API key, required by the proxy strategy
    pub proxy_api_key: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Direct,
            max_attempts: 5,
            retry_delay_secs: 30,
            timeout_secs: 60,
            jitter_ms: 0,
            user_agents: default_user_agents(),
            proxy_endpoint: None,
            proxy_api_key: None,
        }
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
        "Mozilla/5.0 (Linux; Android 11; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.120 Mobile Safari/537.36",
    ]
    .iter()
    .map(|ua| ua.to_string())
    .collect()
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConcurrencyConfig {
    /// Maximum concurrent page tasks; 0 uses the available parallelism
    pub max_workers: u32,
}

/// Run policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Stop every in-flight page as soon as one page permanently fails
    pub abort_on_page_failure: bool,

    /// Fetch each record's detail page for brand and description
    pub detail_pages: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            abort_on_page_failure: false,
            detail_pages: true,
        }
    }
}

/// CSS selectors and literals describing a site's listing markup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarkupProfile {
    pub record_block: String,
    pub id_attribute: String,
    pub product_link: String,
    pub title: String,
    pub price: String,
    pub image: String,
    pub badge: String,
    pub featured_label: String,
    pub fast_shipping: String,
    pub current_page: String,
    pub page_button: String,
    pub brand_row: String,
    pub byline: String,
    pub feature_bullets: String,
    /// Regular expression matched against detail-page headings
    pub about_heading: String,
}

impl Default for MarkupProfile {
    fn default() -> Self {
        Self {
            record_block: r#"div[data-component-type="s-search-result"]"#.to_string(),
            id_attribute: "data-asin".to_string(),
            product_link:
                "a.a-link-normal.s-underline-text.s-underline-link-text.s-link-style.a-text-normal"
                    .to_string(),
            title: "span.a-color-base.a-text-normal".to_string(),
            price: "span.a-offscreen".to_string(),
            image: "img".to_string(),
            badge: "span.a-badge-text".to_string(),
            featured_label: "Best Seller".to_string(),
            fast_shipping: "i.a-icon.a-icon-prime.a-icon-medium".to_string(),
            current_page: "span.s-pagination-item.s-pagination-disabled".to_string(),
            page_button: "a.s-pagination-item.s-pagination-button".to_string(),
            brand_row: "tr.po-brand".to_string(),
            byline: "a#bylineInfo".to_string(),
            feature_bullets: "div#feature-bullets".to_string(),
            about_heading: r"About\s+this\s+item".to_string(),
        }
    }
}

/// One soft-failure rule: a marker substring and the reason logged when it matches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SoftFailureRule {
    pub marker: String,
    pub reason: String,
}

impl SoftFailureRule {
    pub fn new(marker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            reason: reason.into(),
        }
    }
}
