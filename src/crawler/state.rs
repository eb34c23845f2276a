//! Crawl state and its transitions
//!
//! `CrawlState` is owned by exactly one coordinator for the duration of a
//! run. Every method here is a synchronous transition; all waiting happens
//! in the coordinator.

use crate::adapter::Discovery;
use crate::agent::AgentHandle;
use crate::url::item_key;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// One discoverable document, the unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub url: String,
    pub title: String,
}

impl Item {
    /// Dedup key: the canonical form of the item URL
    pub fn key(&self) -> String {
        item_key(&self.url)
    }
}

/// Where the crawl state machine currently is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CrawlPhase {
    #[default]
    Idle,

    /// Waiting for the discovery payload of this results page
    Discovering(String),

    /// Items of the current page remain to be dispatched
    DispatchingItem,

    /// Current page exhausted, a next page is known
    Paginating,

    /// Nothing left to dispatch and no page to follow
    Complete,
}

/// Run state of a single crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    running: bool,
    phase: CrawlPhase,
    pending_items: VecDeque<Item>,
    processed_items: HashSet<String>,
    active_handle: Option<AgentHandle>,
    active_item: Option<Item>,
    next_page_url: Option<String>,
    visited_pages: HashSet<String>,
    expected_total: u64,
    downloaded_count: u64,
    titles: Vec<String>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> &CrawlPhase {
        &self.phase
    }

    pub fn pending_len(&self) -> usize {
        self.pending_items.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed_items.len()
    }

    /// True if the item key was dispatched in the current page epoch
    pub fn is_processed(&self, key: &str) -> bool {
        self.processed_items.contains(key)
    }

    pub fn active_handle(&self) -> Option<AgentHandle> {
        self.active_handle
    }

    pub fn active_item(&self) -> Option<&Item> {
        self.active_item.as_ref()
    }

    pub fn next_page_url(&self) -> Option<&str> {
        self.next_page_url.as_deref()
    }

    pub fn expected_total(&self) -> u64 {
        self.expected_total
    }

    pub fn downloaded_count(&self) -> u64 {
        self.downloaded_count
    }

    /// The title ledger, one entry per item ever accepted in this run
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Idle → Discovering(seed)
    pub fn begin(&mut self, seed_url: impl Into<String>) {
        let seed_url = seed_url.into();
        *self = Self::default();
        self.running = true;
        self.visited_pages.insert(item_key(&seed_url));
        self.phase = CrawlPhase::Discovering(seed_url);
    }

    /// Appends newly discovered items and records pagination
    ///
    /// Items already pending or processed in this page epoch are skipped,
    /// for the queue and the title ledger alike. A next page already
    /// visited in this run is dropped. Returns how many items were accepted.
    pub fn apply_discovery(&mut self, discovery: Discovery) -> usize {
        let mut known: HashSet<String> = self.pending_items.iter().map(Item::key).collect();
        let mut accepted = 0;

        for item in discovery.items {
            let key = item.key();
            if self.processed_items.contains(&key) || !known.insert(key) {
                continue;
            }
            self.titles.push(item.title.clone());
            self.pending_items.push_back(item);
            accepted += 1;
        }

        self.next_page_url = discovery.next_page_url.filter(|next| {
            let revisit = self.visited_pages.contains(&item_key(next));
            if revisit {
                tracing::warn!("Next page {} was already visited; not following it", next);
            }
            !revisit
        });
        self.expected_total = self
            .expected_total
            .max(self.titles.len() as u64)
            .max(discovery.total_count.unwrap_or(0));

        accepted
    }

    /// Picks the next phase from what remains
    pub fn settle_phase(&mut self) {
        if !self.running {
            self.phase = CrawlPhase::Idle;
        } else if !self.pending_items.is_empty() {
            self.phase = CrawlPhase::DispatchingItem;
        } else if self.next_page_url.is_some() {
            self.phase = CrawlPhase::Paginating;
        } else {
            self.phase = CrawlPhase::Complete;
        }
    }

    /// Takes the first unprocessed item and marks it processed
    pub fn next_item(&mut self) -> Option<Item> {
        while let Some(item) = self.pending_items.pop_front() {
            if self.processed_items.insert(item.key()) {
                self.active_item = Some(item.clone());
                return Some(item);
            }
        }
        None
    }

    /// Paginating → Discovering(next), starting a new page epoch
    pub fn advance_page(&mut self) -> Option<String> {
        let next = self.next_page_url.take()?;
        self.visited_pages.insert(item_key(&next));
        self.processed_items.clear();
        self.phase = CrawlPhase::Discovering(next.clone());
        Some(next)
    }

    pub fn set_active_handle(&mut self, handle: AgentHandle) {
        self.active_handle = Some(handle);
    }

    pub fn take_active_handle(&mut self) -> Option<AgentHandle> {
        self.active_handle.take()
    }

    pub fn take_active_item(&mut self) -> Option<Item> {
        self.active_item.take()
    }

    /// Counts one successful extraction
    pub fn record_download(&mut self) -> u64 {
        self.downloaded_count += 1;
        self.downloaded_count
    }

    /// Back to a fresh idle state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
