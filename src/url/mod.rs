//! URL handling module for Cite-Harvest
//!
//! Items are deduplicated by a canonical key derived from their URL, so that
//! the same document reached through cosmetically different links is only
//! dispatched once per page epoch.

mod normalize;

pub use normalize::{canonicalize_url, item_key};

use ::url::Url;

/// Resolves an href found on `base` to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, non-navigational schemes and anything that
/// does not resolve to HTTP or HTTPS.
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Returns true if `href` only targets an anchor inside the current document
pub fn is_fragment_only(href: &str) -> bool {
    href.trim().starts_with('#')
}
