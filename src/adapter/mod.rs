//! Page adapters
//!
//! A page adapter knows the markup of one catalog: where the item links are
//! on a results page, where the pagination control is, and which controls on
//! an item page yield its citation file. Everything else in the harvester is
//! catalog-agnostic.

mod selector;

pub use selector::SelectorAdapter;

use crate::config::ControlSelectors;
use crate::crawler::Item;
use serde::{Deserialize, Serialize};
use url::Url;

/// What discovery found on one results page
///
/// Serialized, this is the discovery payload handed to the coordinator:
/// `{ "items": [{"url", "title"}], "nextPageUrl"?, "totalCount"? }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    /// Items listed on the page, in page order
    pub items: Vec<Item>,

    /// Absolute URL of the next results page, when pagination continues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,

    /// Total result count advertised by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl Discovery {
    /// True if the page yielded no items and no continuation
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.next_page_url.is_none()
    }
}

/// Catalog-specific page reading
pub trait PageAdapter: Send + Sync {
    /// Reads a results page
    ///
    /// An empty [`Discovery`] is a valid outcome, not an error.
    fn discover(&self, html: &str, page_url: &Url) -> Discovery;

    /// Returns the cite/download controls for an item page
    fn citation_controls(&self, page_url: &Url) -> ControlSelectors;
}
