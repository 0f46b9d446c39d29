use crate::config::SearchConfig;
use crate::UrlError;
use url::Url;

/// Builds the search URL for a free-text term
///
/// The term is trimmed and form-encoded into the configured query parameter,
/// so spaces become `+`.
///
/// # Examples
///
/// ```
/// use listing_harvest::config::Config;
/// use listing_harvest::url::build_search_url;
///
/// let config = Config::for_site("https://shop.example.com");
/// let url = build_search_url(&config.search, "smart phones").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example.com/s?k=smart+phones");
/// ```
pub fn build_search_url(config: &SearchConfig, term: &str) -> Result<Url, UrlError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(UrlError::EmptySearchTerm);
    }

    let base = Url::parse(&config.base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(UrlError::InvalidScheme(base.scheme().to_string()));
    }

    let mut url = base
        .join(&config.search_path)
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    url.query_pairs_mut()
        .clear()
        .append_pair(&config.query_param, term);

    Ok(url)
}

/// Returns the URL of result page `page` by appending a `page` parameter
///
/// The search URL is kept verbatim so page URLs differ from it only by the
/// appended parameter.
pub fn page_url(search_url: &Url, page: u32) -> String {
    let separator = if search_url.query().is_some() { '&' } else { '?' };
    format!("{}{}page={}", search_url, separator, page)
}
