//! HTTP fetcher implementation
//!
//! This module handles every HTTP request of a search run:
//! - Building the HTTP client with browser-like default headers
//! - Sending one GET per attempt, directly or through a fetch proxy
//! - Classifying transport failures
//! - Retrying soft-failure pages with a fixed delay

use crate::config::{FetchConfig, FetchStrategy};
use crate::harvest::validator::{PageValidator, Verdict};
use crate::HarvestError;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, PRAGMA,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::Client;
use std::time::Duration;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with a 2xx status
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, unreadable body)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// How requests leave the process
#[derive(Debug, Clone)]
enum Transport {
    /// GET the target itself, rotating user agents
    Direct {
        user_agents: Vec<String>,
        jitter_ms: u64,
    },
    /// GET the proxy endpoint, which fetches the target on our behalf
    Proxy { endpoint: String, api_key: String },
}

/// Builds the HTTP client shared by every fetch of a run
///
/// The client keeps a cookie store so direct fetches behave like one browser
/// session, and sends the navigation headers a browser would. The user agent
/// is set per request.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-GB,en-US;q=0.9,en;q=0.8"),
    );

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with retry-on-invalid-page semantics
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Valid page | Return the body |
/// | Soft-failure page | Log the rule's reason, sleep, retry up to `max-attempts` |
/// | Non-2xx status | Immediate `HarvestError::Status`, no retry |
/// | Connection error / timeout | Immediate `HarvestError::Http`, no retry |
pub struct PageFetcher {
    client: Client,
    transport: Transport,
    validator: PageValidator,
    max_attempts: u32,
    retry_delay: Duration,
}

impl PageFetcher {
    /// Creates a fetcher for the configured strategy
    pub fn new(config: &FetchConfig, validator: PageValidator) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;

        let transport = match config.strategy {
            FetchStrategy::Direct => Transport::Direct {
                user_agents: config
                    .user_agents
                    .iter()
                    .filter(|ua| !ua.trim().is_empty())
                    .cloned()
                    .collect(),
                jitter_ms: config.jitter_ms,
            },
            FetchStrategy::Proxy => Transport::Proxy {
                endpoint: config.proxy_endpoint.clone().unwrap_or_default(),
                api_key: config.proxy_api_key.clone().unwrap_or_default(),
            },
        };

        Ok(Self {
            client,
            transport,
            validator,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetches `url` until a valid page arrives or the attempt cap is reached
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The body of a page that passed validation
    /// * `Err(HarvestError::Http | HarvestError::Status)` - Transport failure, not retried
    /// * `Err(HarvestError::SoftFailureExhausted)` - Every attempt was a soft-failure page
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_attempts {
            let body = match self.fetch_once(url).await {
                FetchResult::Success {
                    final_url,
                    status_code,
                    body,
                } => {
                    tracing::trace!(status = status_code, final_url = %final_url, "Fetched {}", url);
                    body
                }
                FetchResult::HttpError { status_code } => {
                    tracing::warn!("HTTP {} while fetching {}", status_code, url);
                    return Err(HarvestError::Status {
                        url: url.to_string(),
                        status: status_code,
                    });
                }
                FetchResult::NetworkError { error } => {
                    tracing::warn!("{} while connecting to {}", error, url);
                    return Err(HarvestError::Http {
                        url: url.to_string(),
                        message: error,
                    });
                }
            };

            match self.validator.classify(&body) {
                Verdict::Valid => {
                    if attempt > 1 {
                        tracing::debug!("Valid page for {} on attempt {}", url, attempt);
                    }
                    return Ok(body);
                }
                Verdict::SoftFailure(rule) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        reason = %rule.reason,
                        "Soft-failure page from {}",
                        url
                    );
                    last_reason = rule.reason.clone();
                }
            }

            if attempt < self.max_attempts {
                tracing::info!(
                    "No valid page for {}, retrying in {}s",
                    url,
                    self.retry_delay.as_secs()
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        tracing::error!(
            "No valid page for {} after {} attempts, giving up on it",
            url,
            self.max_attempts
        );
        Err(HarvestError::SoftFailureExhausted {
            url: url.to_string(),
            attempts: self.max_attempts,
            reason: last_reason,
        })
    }

    /// Sends one GET through the configured transport and classifies the response
    pub async fn fetch_once(&self, url: &str) -> FetchResult {
        let request = match &self.transport {
            Transport::Direct { jitter_ms, .. } => {
                if *jitter_ms > 0 {
                    tokio::time::sleep(self.jitter(*jitter_ms)).await;
                }
                let mut request = self.client.get(url);
                if let Some(user_agent) = self.pick_user_agent() {
                    request = request.header(USER_AGENT, user_agent);
                }
                request
            }
            Transport::Proxy { endpoint, api_key } => self
                .client
                .get(endpoint)
                .query(&[("api_key", api_key.as_str()), ("url", url)]),
        };

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let final_url = response.url().to_string();

                if !status.is_success() {
                    return FetchResult::HttpError {
                        status_code: status.as_u16(),
                    };
                }

                match response.text().await {
                    Ok(body) => FetchResult::Success {
                        final_url,
                        status_code: status.as_u16(),
                        body,
                    },
                    Err(e) => FetchResult::NetworkError {
                        error: e.to_string(),
                    },
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    FetchResult::NetworkError {
                        error: "Request timeout".to_string(),
                    }
                } else if e.is_connect() {
                    FetchResult::NetworkError {
                        error: "Connection refused".to_string(),
                    }
                } else {
                    FetchResult::NetworkError {
                        error: e.to_string(),
                    }
                }
            }
        }
    }

    fn pick_user_agent(&self) -> Option<String> {
        match &self.transport {
            Transport::Direct { user_agents, .. } => user_agents.choose(&mut rand::rng()).cloned(),
            Transport::Proxy { .. } => None,
        }
    }

    fn jitter(&self, upper_ms: u64) -> Duration {
        Duration::from_millis(rand::rng().random_range(0..=upper_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_config() -> FetchConfig {
        FetchConfig::default()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&fetch_config()).is_ok());
    }

    #[test]
    fn test_direct_fetcher_rotates_configured_agents() {
        let mut config = fetch_config();
        config.user_agents = vec!["AgentOne/1.0".to_string(), "  ".to_string()];
        let fetcher = PageFetcher::new(&config, PageValidator::default()).unwrap();
        for _ in 0..10 {
            assert_eq!(fetcher.pick_user_agent().as_deref(), Some("AgentOne/1.0"));
        }
    }

    #[test]
    fn test_proxy_fetcher_sets_no_user_agent() {
        let mut config = fetch_config();
        config.strategy = FetchStrategy::Proxy;
        config.proxy_endpoint = Some("https://proxy.example.net".to_string());
        config.proxy_api_key = Some("key".to_string());
        let fetcher = PageFetcher::new(&config, PageValidator::default()).unwrap();
        assert_eq!(fetcher.pick_user_agent(), None);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let fetcher = PageFetcher::new(&fetch_config(), PageValidator::default()).unwrap();
        for _ in 0..20 {
            assert!(fetcher.jitter(25) <= Duration::from_millis(25));
        }
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let mut config = fetch_config();
        config.max_attempts = 0;
        let fetcher = PageFetcher::new(&config, PageValidator::default()).unwrap();
        assert_eq!(fetcher.max_attempts(), 1);
    }

    // Retry and strategy behaviour against a live server is covered by the
    // wiremock tests under tests/integration
}
