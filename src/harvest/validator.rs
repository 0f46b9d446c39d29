//! Soft-failure page detection
//!
//! Sites frequently answer with HTTP 200 and a page that is not the one asked
//! for: a bot check, an empty result set, an error page. The validator runs an
//! ordered list of marker rules over the body; the first rule whose marker
//! occurs classifies the page, and a page matching no rule is valid.

use crate::config::SoftFailureRule;

/// Built-in rules, checked top to bottom
const DEFAULT_RULES: &[(&str, &str)] = &[
    (
        "We're sorry. The Web address you entered is not a functioning page on our site.",
        "invalid address page",
    ),
    (
        "Try checking your spelling or use more general terms",
        "no results page",
    ),
    (
        "Sorry, we just need to make sure you're not a robot.",
        "bot check page",
    ),
    (
        "The request could not be satisfied",
        "request could not be satisfied (rate limited)",
    ),
];

/// Classification of a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    Valid,
    /// The page matched this rule
    SoftFailure(&'a SoftFailureRule),
}

impl Verdict<'_> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Ordered soft-failure rule set
#[derive(Debug, Clone)]
pub struct PageValidator {
    rules: Vec<SoftFailureRule>,
}

impl PageValidator {
    /// Creates a validator with the given rules, in priority order
    pub fn new(rules: Vec<SoftFailureRule>) -> Self {
        Self { rules }
    }

    /// Uses the configured rules, or the built-in ones when none are configured
    pub fn from_rules(configured: &[SoftFailureRule]) -> Self {
        if configured.is_empty() {
            Self::default()
        } else {
            Self::new(configured.to_vec())
        }
    }

    pub fn rules(&self) -> &[SoftFailureRule] {
        &self.rules
    }

    /// Returns the first rule whose marker occurs in `html`
    pub fn classify(&self, html: &str) -> Verdict<'_> {
        self.rules
            .iter()
            .find(|rule| html.contains(rule.marker.as_str()))
            .map_or(Verdict::Valid, Verdict::SoftFailure)
    }

    pub fn is_valid(&self, html: &str) -> bool {
        self.classify(html).is_valid()
    }
}

impl Default for PageValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_RULES
                .iter()
                .map(|(marker, reason)| SoftFailureRule::new(*marker, *reason))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body><div data-component-type="s-search-result">Kettle</div></body></html>"#;

    #[test]
    fn test_listing_page_is_valid() {
        assert!(PageValidator::default().is_valid(LISTING));
    }

    #[test]
    fn test_each_default_marker_is_invalid() {
        let validator = PageValidator::default();
        for (marker, reason) in DEFAULT_RULES {
            let html = format!("<html><body><p>{}</p></body></html>", marker);
            match validator.classify(&html) {
                Verdict::SoftFailure(rule) => assert_eq!(rule.reason, *reason),
                Verdict::Valid => panic!("marker not detected: {}", marker),
            }
        }
    }

    #[test]
    fn test_rate_limit_marker_is_invalid() {
        let html = "<h1>ERROR</h1><h2>The request could not be satisfied</h2>";
        let validator = PageValidator::default();
        assert!(!validator.is_valid(html));
        match validator.classify(html) {
            Verdict::SoftFailure(rule) => assert!(rule.reason.contains("rate limited")),
            Verdict::Valid => panic!("rate limit page classified as valid"),
        }
    }

    #[test]
    fn test_first_rule_in_order_wins() {
        // Both the bot-check and the rate-limit markers are present; the bot
        // check is earlier in rule order regardless of position in the page.
        let html = "The request could not be satisfied ... \
                    Sorry, we just need to make sure you're not a robot.";
        match PageValidator::default().classify(html) {
            Verdict::SoftFailure(rule) => assert_eq!(rule.reason, "bot check page"),
            Verdict::Valid => panic!("expected soft failure"),
        }
    }

    #[test]
    fn test_configured_rules_replace_defaults() {
        let validator =
            PageValidator::from_rules(&[SoftFailureRule::new("Access denied", "firewall")]);
        assert_eq!(validator.rules().len(), 1);
        assert!(!validator.is_valid("<p>Access denied</p>"));
        assert!(validator.is_valid("Sorry, we just need to make sure you're not a robot."));
    }

    #[test]
    fn test_empty_configuration_uses_defaults() {
        let validator = PageValidator::from_rules(&[]);
        assert_eq!(validator.rules().len(), DEFAULT_RULES.len());
    }
}
