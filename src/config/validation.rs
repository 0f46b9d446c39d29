use crate::config::types::{
    ConcurrencyConfig, Config, FetchConfig, FetchStrategy, MarkupProfile, SearchConfig,
    SoftFailureRule,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_fetch_config(&config.fetch)?;
    validate_concurrency_config(&config.concurrency)?;
    validate_markup_profile(&config.markup)?;
    validate_soft_failure_rules(&config.soft_failure)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.search_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "search-path must start with '/', got '{}'",
            config.search_path
        )));
    }

    if config.query_param.is_empty() {
        return Err(ConfigError::Validation(
            "query-param cannot be empty".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    match config.strategy {
        FetchStrategy::Direct => {
            if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "direct strategy needs at least one non-empty user agent".to_string(),
                ));
            }
        }
        FetchStrategy::Proxy => {
            let endpoint = config.proxy_endpoint.as_deref().ok_or_else(|| {
                ConfigError::Validation("proxy strategy requires proxy-endpoint".to_string())
            })?;
            Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy-endpoint: {}", e)))?;

            if config
                .proxy_api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
            {
                return Err(ConfigError::Validation(
                    "proxy strategy requires proxy-api-key".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Validates worker pool configuration
fn validate_concurrency_config(config: &ConcurrencyConfig) -> Result<(), ConfigError> {
    if config.max_workers > 256 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be <= 256, got {}",
            config.max_workers
        )));
    }
    Ok(())
}

/// Validates that every selector in the markup profile parses
fn validate_markup_profile(profile: &MarkupProfile) -> Result<(), ConfigError> {
    let selectors = [
        ("record-block", &profile.record_block),
        ("product-link", &profile.product_link),
        ("title", &profile.title),
        ("price", &profile.price),
        ("image", &profile.image),
        ("badge", &profile.badge),
        ("fast-shipping", &profile.fast_shipping),
        ("current-page", &profile.current_page),
        ("page-button", &profile.page_button),
        ("brand-row", &profile.brand_row),
        ("byline", &profile.byline),
        ("feature-bullets", &profile.feature_bullets),
    ];

    for (field, selector) in selectors {
        parse_selector(field, selector)?;
    }

    if profile.id_attribute.is_empty() {
        return Err(ConfigError::Validation(
            "markup id-attribute cannot be empty".to_string(),
        ));
    }

    Regex::new(&profile.about_heading).map_err(|e| {
        ConfigError::Validation(format!("Invalid about-heading pattern: {}", e))
    })?;

    Ok(())
}

/// Parses a CSS selector, naming the profile field on failure
pub(crate) fn parse_selector(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

/// Validates configured soft-failure rules
fn validate_soft_failure_rules(rules: &[SoftFailureRule]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.marker.is_empty() {
            return Err(ConfigError::Validation(format!(
                "soft-failure rule '{}' has an empty marker",
                rule.reason
            )));
        }
    }
    Ok(())
}
