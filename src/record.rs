//! The record data model
//!
//! A [`Record`] is the immutable snapshot of one listing item. Listing-page
//! fields and detail-page fields are gathered separately ([`ListingFields`],
//! [`DetailFields`]) and merged once into a record.

use serde::{Deserialize, Serialize};

/// One scraped listing item
///
/// Serializes as a flat JSON object with camelCase keys. Absent optionals are
/// written as `null`, never omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Absolute URL of the item's detail page
    pub source_url: String,

    /// Site-assigned identifier (may be empty)
    pub external_id: String,

    pub title: String,

    /// Brand, read from the detail page
    pub brand: String,

    /// Feature bullets from the detail page, newline separated
    pub description: String,

    pub price: Option<f64>,

    pub image_url: String,

    /// Star rating between 0.0 and 5.0
    pub rating_stars: Option<f64>,

    pub review_count: Option<u64>,

    pub is_featured: bool,

    pub has_fast_shipping: bool,
}

impl Record {
    /// Assembles a record from the listing-page fields and the detail-page fields
    pub fn assemble(listing: ListingFields, detail: DetailFields) -> Self {
        Self {
            source_url: listing.source_url,
            external_id: listing.external_id,
            title: listing.title,
            brand: detail.brand,
            description: detail.description,
            price: listing.price,
            image_url: listing.image_url,
            rating_stars: listing.rating_stars,
            review_count: listing.review_count,
            is_featured: listing.is_featured,
            has_fast_shipping: listing.has_fast_shipping,
        }
    }
}

/// Fields available on the search-results page itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFields {
    pub source_url: String,
    pub external_id: String,
    pub title: String,
    pub price: Option<f64>,
    pub image_url: String,
    pub rating_stars: Option<f64>,
    pub review_count: Option<u64>,
    pub is_featured: bool,
    pub has_fast_shipping: bool,
}

/// Fields that require a fetch of the item's own detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub brand: String,
    pub description: String,
}
