//! CSS-selector driven page adapter

use super::{Discovery, PageAdapter};
use crate::config::{AdapterConfig, ControlSelectors};
use crate::crawler::Item;
use crate::url::{item_key, resolve_href};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Page adapter configured entirely by [`AdapterConfig`]
///
/// Item selectors may match the link itself or an element inside it (the
/// title span of a result card); in the latter case the nearest enclosing
/// anchor supplies the href.
#[derive(Debug, Clone)]
pub struct SelectorAdapter {
    item_selectors: Vec<Selector>,
    item_path_markers: Vec<String>,
    next_page: Selector,
    disabled_class: String,
    total: Selector,
    total_pattern: Regex,
    article: ControlSelectors,
    chapter: ControlSelectors,
}

impl SelectorAdapter {
    /// Compiles the selectors and the total pattern
    pub fn new(config: &AdapterConfig) -> ConfigResult<Self> {
        let item_selectors = config
            .item_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<ConfigResult<Vec<_>>>()?;

        let total_pattern = Regex::new(&config.total_pattern)
            .map_err(|e| ConfigError::Validation(format!("total_pattern: {}", e)))?;

        Ok(Self {
            item_selectors,
            item_path_markers: config.item_path_markers.clone(),
            next_page: compile(&config.next_page_selector)?,
            disabled_class: config.disabled_class.clone(),
            total: compile(&config.total_selector)?,
            total_pattern,
            article: config.article.clone(),
            chapter: config.chapter.clone(),
        })
    }

    fn is_item_href(&self, href: &str) -> bool {
        self.item_path_markers.is_empty()
            || self
                .item_path_markers
                .iter()
                .any(|marker| href.contains(marker.as_str()))
    }

    fn extract_items(&self, document: &Html, page_url: &Url) -> Vec<Item> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for selector in &self.item_selectors {
            for element in document.select(selector) {
                let Some(href) = enclosing_href(element) else {
                    continue;
                };
                if !self.is_item_href(href) {
                    continue;
                }
                let Some(url) = resolve_href(href, page_url) else {
                    continue;
                };

                if !seen.insert(item_key(url.as_str())) {
                    continue;
                }

                let title = collapse_whitespace(&element.text().collect::<String>());
                let title = if title.is_empty() {
                    url.to_string()
                } else {
                    title
                };

                items.push(Item {
                    url: url.to_string(),
                    title,
                });
            }
        }

        items
    }

    fn extract_next_page(&self, document: &Html, page_url: &Url) -> Option<String> {
        let control = document.select(&self.next_page).next()?;

        if control
            .value()
            .classes()
            .any(|class| class == self.disabled_class)
        {
            return None;
        }

        let href = control.value().attr("href")?;
        resolve_href(href, page_url)
            .filter(|next| next != page_url)
            .map(|next| next.to_string())
    }

    fn extract_total(&self, document: &Html) -> Option<u64> {
        let text: String = document.select(&self.total).next()?.text().collect();
        let captures = self.total_pattern.captures(&text)?;
        let digits: String = captures
            .get(1)?
            .as_str()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

impl PageAdapter for SelectorAdapter {
    fn discover(&self, html: &str, page_url: &Url) -> Discovery {
        let document = Html::parse_document(html);

        let discovery = Discovery {
            items: self.extract_items(&document, page_url),
            next_page_url: self.extract_next_page(&document, page_url),
            total_count: self.extract_total(&document),
        };

        tracing::debug!(
            "Discovered {} items on {} (next page: {})",
            discovery.items.len(),
            page_url,
            discovery.next_page_url.as_deref().unwrap_or("none")
        );

        discovery
    }

    fn citation_controls(&self, page_url: &Url) -> ControlSelectors {
        if page_url.path().contains("/chapter/") {
            self.chapter.clone()
        } else {
            self.article.clone()
        }
    }
}

fn compile(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Href of the element itself if it is an anchor, else of its nearest anchor ancestor
fn enclosing_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() == "a" {
        return element.value().attr("href");
    }

    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
