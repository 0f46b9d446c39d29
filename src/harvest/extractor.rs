//! Record extraction from listing and detail markup
//!
//! Extraction is split the way pages arrive:
//! - `find_record_blocks` cuts a results page into one HTML fragment per item
//! - `extract` reads the listing fields of one fragment
//! - `extract_detail` reads brand and description from an item's detail page
//!
//! Every field is read by its own function returning `Option`; a missing or
//! malformed field leaves the default value and never stops the other fields.

use crate::config::{parse_selector, MarkupProfile};
use crate::record::{DetailFields, ListingFields};
use crate::url::resolve_against;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static RATING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\.\d) out of 5").expect("valid rating regex"));

static REVIEW_COUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s+ratings").expect("valid review count regex"));

/// A site-specific extraction strategy
///
/// Implementations must never panic on unexpected markup; absent fields come
/// back as defaults.
pub trait ListingExtractor: Send + Sync {
    /// Returns the outer HTML of every top-level record block, in document order
    fn find_record_blocks(&self, page_html: &str) -> Vec<String>;

    /// Reads the listing-page fields of one record block
    fn extract(&self, block_html: &str) -> ListingFields;

    /// Reads brand and description from a detail page
    fn extract_detail(&self, detail_html: &str) -> DetailFields;
}

/// Compiled form of a [`MarkupProfile`]
#[derive(Debug)]
struct CompiledSelectors {
    record_block: Selector,
    product_link: Selector,
    title: Selector,
    price: Selector,
    image: Selector,
    badge: Selector,
    fast_shipping: Selector,
    brand_row: Selector,
    byline: Selector,
    feature_bullets: Selector,
    heading: Selector,
    list_item: Selector,
    cell: Selector,
    span: Selector,
}

/// Selector-driven extractor configured by a [`MarkupProfile`]
#[derive(Debug)]
pub struct MarkupExtractor {
    base_url: Url,
    id_attribute: String,
    featured_label: String,
    about_heading: Regex,
    selectors: CompiledSelectors,
}

impl MarkupExtractor {
    /// Compiles the profile's selectors; product links resolve against `base_url`
    pub fn new(profile: &MarkupProfile, base_url: Url) -> Result<Self, ConfigError> {
        let selectors = CompiledSelectors {
            record_block: parse_selector("record-block", &profile.record_block)?,
            product_link: parse_selector("product-link", &profile.product_link)?,
            title: parse_selector("title", &profile.title)?,
            price: parse_selector("price", &profile.price)?,
            image: parse_selector("image", &profile.image)?,
            badge: parse_selector("badge", &profile.badge)?,
            fast_shipping: parse_selector("fast-shipping", &profile.fast_shipping)?,
            brand_row: parse_selector("brand-row", &profile.brand_row)?,
            byline: parse_selector("byline", &profile.byline)?,
            feature_bullets: parse_selector("feature-bullets", &profile.feature_bullets)?,
            heading: parse_selector("heading", "h1, h2, h3, h4, h5, h6")?,
            list_item: parse_selector("list-item", "li")?,
            cell: parse_selector("cell", "td")?,
            span: parse_selector("span", "span")?,
        };

        let about_heading = Regex::new(&profile.about_heading).map_err(|e| {
            ConfigError::Validation(format!("Invalid about-heading pattern: {}", e))
        })?;

        Ok(Self {
            base_url,
            id_attribute: profile.id_attribute.clone(),
            featured_label: profile.featured_label.clone(),
            about_heading,
            selectors,
        })
    }
}

/// One record block plus the text views the pattern-based fields search
struct BlockContext<'a> {
    extractor: &'a MarkupExtractor,
    block: ElementRef<'a>,
    /// Rendered text, whitespace collapsed
    text: String,
    /// Raw markup, where attribute-borne text such as aria labels lives
    markup: String,
}

/// A field step fills one field and reports whether it found a value
type FieldStep = fn(&BlockContext<'_>, &mut ListingFields) -> bool;

/// Listing fields in extraction order
const LISTING_FIELD_STEPS: &[(&str, FieldStep)] = &[
    ("source_url", step_source_url),
    ("external_id", step_external_id),
    ("title", step_title),
    ("price", step_price),
    ("image_url", step_image_url),
    ("rating_stars", step_rating),
    ("review_count", step_review_count),
    ("is_featured", step_featured),
    ("has_fast_shipping", step_fast_shipping),
];

impl ListingExtractor for MarkupExtractor {
    fn find_record_blocks(&self, page_html: &str) -> Vec<String> {
        let document = Html::parse_document(page_html);
        let block_selector = &self.selectors.record_block;

        document
            .select(block_selector)
            .filter(|block| {
                !block
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| block_selector.matches(&ancestor))
            })
            .map(|block| block.html())
            .collect()
    }

    fn extract(&self, block_html: &str) -> ListingFields {
        // The block selector may depend on markup outside the block, so take
        // the fragment's first element rather than matching it again
        let fragment = Html::parse_fragment(block_html);
        let root = fragment.root_element();
        let block = root
            .children()
            .filter_map(ElementRef::wrap)
            .next()
            .unwrap_or(root);

        let ctx = BlockContext {
            extractor: self,
            block,
            text: collapsed_text(block),
            markup: block.html(),
        };

        let mut fields = ListingFields::default();
        for (name, step) in LISTING_FIELD_STEPS {
            if !step(&ctx, &mut fields) {
                tracing::trace!(field = *name, "field not present in record block");
            }
        }
        fields
    }

    fn extract_detail(&self, detail_html: &str) -> DetailFields {
        let document = Html::parse_document(detail_html);
        DetailFields {
            brand: self.brand(&document).unwrap_or_default(),
            description: self
                .feature_bullets(&document)
                .map(|bullets| bullets.join("\n"))
                .unwrap_or_default(),
        }
    }
}

fn step_source_url(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    store(&mut fields.source_url, product_url(ctx))
}

fn step_external_id(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    store(&mut fields.external_id, external_id(ctx))
}

fn step_title(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    store(&mut fields.title, title(ctx))
}

fn step_price(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    fields.price = price(ctx);
    fields.price.is_some()
}

fn step_image_url(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    store(&mut fields.image_url, image_url(ctx))
}

fn step_rating(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    fields.rating_stars = parse_rating(&ctx.text).or_else(|| parse_rating(&ctx.markup));
    fields.rating_stars.is_some()
}

fn step_review_count(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    fields.review_count =
        parse_review_count(&ctx.text).or_else(|| parse_review_count(&ctx.markup));
    fields.review_count.is_some()
}

fn step_featured(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    fields.is_featured = is_featured(ctx);
    true
}

fn step_fast_shipping(ctx: &BlockContext<'_>, fields: &mut ListingFields) -> bool {
    fields.has_fast_shipping = ctx
        .block
        .select(&ctx.extractor.selectors.fast_shipping)
        .next()
        .is_some();
    true
}

fn store(slot: &mut String, value: Option<String>) -> bool {
    match value {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn product_url(ctx: &BlockContext<'_>) -> Option<String> {
    let href = ctx
        .block
        .select(&ctx.extractor.selectors.product_link)
        .next()?
        .value()
        .attr("href")?;
    resolve_against(&ctx.extractor.base_url, href)
}

fn external_id(ctx: &BlockContext<'_>) -> Option<String> {
    ctx.block
        .value()
        .attr(&ctx.extractor.id_attribute)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn title(ctx: &BlockContext<'_>) -> Option<String> {
    ctx.block
        .select(&ctx.extractor.selectors.title)
        .next()
        .map(|span| span.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn price(ctx: &BlockContext<'_>) -> Option<f64> {
    let node = ctx.block.select(&ctx.extractor.selectors.price).next()?;
    parse_price(&node.text().collect::<String>())
}

fn image_url(ctx: &BlockContext<'_>) -> Option<String> {
    ctx.block
        .select(&ctx.extractor.selectors.image)
        .next()?
        .value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

/// Only the first badge counts; a featured label behind another badge is ignored
fn is_featured(ctx: &BlockContext<'_>) -> bool {
    ctx.block
        .select(&ctx.extractor.selectors.badge)
        .next()
        .is_some_and(|badge| badge.text().collect::<String>().trim() == ctx.extractor.featured_label)
}

impl MarkupExtractor {
    /// Brand from the product details table, else from the byline link
    fn brand(&self, document: &Html) -> Option<String> {
        self.brand_from_table(document)
            .or_else(|| self.brand_from_byline(document))
    }

    fn brand_from_table(&self, document: &Html) -> Option<String> {
        let row = document.select(&self.selectors.brand_row).next()?;
        let value_cell = row.select(&self.selectors.cell).nth(1)?;
        let value = value_cell
            .select(&self.selectors.span)
            .next()
            .unwrap_or(value_cell);
        non_empty(value.text().collect::<String>().trim())
    }

    fn brand_from_byline(&self, document: &Html) -> Option<String> {
        let byline = document.select(&self.selectors.byline).next()?;
        let text = byline.text().collect::<String>();
        let brand = text.split(": ").nth(1).unwrap_or(&text);
        non_empty(brand.trim())
    }

    /// Bullet texts under the "About this item" heading, else in the feature-bullets container
    fn feature_bullets(&self, document: &Html) -> Option<Vec<String>> {
        self.bullets_under_heading(document)
            .or_else(|| {
                let container = document.select(&self.selectors.feature_bullets).next()?;
                Some(self.list_items(container))
            })
            .filter(|bullets| !bullets.is_empty())
    }

    fn bullets_under_heading(&self, document: &Html) -> Option<Vec<String>> {
        let heading = document.select(&self.selectors.heading).find(|heading| {
            self.about_heading
                .is_match(&heading.text().collect::<String>())
        })?;
        let section = heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| ancestor.value().name() == "div")?;
        Some(self.list_items(section)).filter(|bullets| !bullets.is_empty())
    }

    fn list_items(&self, container: ElementRef<'_>) -> Vec<String> {
        container
            .select(&self.selectors.list_item)
            .map(collapsed_text)
            .filter(|bullet| !bullet.is_empty())
            .collect()
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Rendered text of an element with runs of whitespace collapsed to one space
fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a displayed price such as `$1,299.99`
///
/// Leading currency symbols and thousands separators are dropped. Anything
/// that still does not parse as a non-negative number yields None, never zero.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// Finds `<d>.<d> out of 5` and returns the rating
pub fn parse_rating(text: &str) -> Option<f64> {
    RATING_PATTERN
        .captures(text)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|rating| (0.0..=5.0).contains(rating))
}

/// Finds `<integer> ratings` (thousands separators allowed) and returns the count
pub fn parse_review_count(text: &str) -> Option<u64> {
    REVIEW_COUNT_PATTERN
        .captures(text)?
        .get(1)?
        .as_str()
        .replace(',', "")
        .parse::<u64>()
        .ok()
}
