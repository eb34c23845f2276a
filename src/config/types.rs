use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Cite-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    pub output: OutputConfig,
}

/// Orchestrator pacing and timeouts (all values in milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Fixed delay between two item dispatches
    #[serde(rename = "inter-item-delay")]
    pub inter_item_delay: u64,

    /// Upper bound on waiting for a document to become ready
    #[serde(rename = "ready-timeout")]
    pub ready_timeout: u64,

    /// Pause after readiness before running a routine inside the page
    #[serde(rename = "settle-delay")]
    pub settle_delay: u64,

    /// Upper bound on any single command sent to a render agent
    #[serde(rename = "operation-timeout")]
    pub operation_timeout: u64,
}

impl CrawlerConfig {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            inter_item_delay: 2000,
            ready_timeout: 30_000,
            settle_delay: 2000,
            operation_timeout: 120_000,
        }
    }
}

/// Citation extraction retry policy (durations in milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Attempts of the cite/download click sequence per item
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay between two attempts
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,

    /// How long to wait for each control to appear
    #[serde(rename = "element-timeout")]
    pub element_timeout: u64,

    /// Polling interval while waiting for a control
    #[serde(rename = "poll-interval")]
    pub poll_interval: u64,

    /// Pause after the download control has been triggered
    #[serde(rename = "download-settle")]
    pub download_settle: u64,

    /// Bound on each request made while extracting (page load, cite, download)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

impl ExtractionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Longest an extraction can take when every wait and request runs out
    ///
    /// One page load, then per attempt two control waits, two requests
    /// and the settle pause, with a retry delay between attempts.
    pub fn worst_case(&self) -> Duration {
        let attempts = u64::from(self.max_attempts.max(1));
        let per_attempt = 2 * self.element_timeout + 2 * self.request_timeout + self.download_settle;

        Duration::from_millis(
            self.request_timeout + attempts * per_attempt + (attempts - 1) * self.retry_delay,
        )
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: 2000,
            element_timeout: 5000,
            poll_interval: 250,
            download_settle: 1500,
            request_timeout: 10_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// The catalog being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// First results page of the catalog search
    #[serde(rename = "seed-url")]
    pub seed_url: String,
}

/// CSS selectors used to read catalog pages
///
/// Defaults target the SpringerLink search and article layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Selectors matching item links (or a span inside an item link)
    #[serde(rename = "item-selectors")]
    pub item_selectors: Vec<String>,

    /// Substrings an item href must contain to count as an item
    #[serde(rename = "item-path-markers")]
    pub item_path_markers: Vec<String>,

    /// Selector of the "next page" control
    #[serde(rename = "next-page-selector")]
    pub next_page_selector: String,

    /// Class marking the next-page control as disabled
    #[serde(rename = "disabled-class")]
    pub disabled_class: String,

    /// Selector of the element holding the result total
    #[serde(rename = "total-selector")]
    pub total_selector: String,

    /// Regex with one capture group extracting the total
    #[serde(rename = "total-pattern")]
    pub total_pattern: String,

    /// Cite/download controls on article pages
    pub article: ControlSelectors,

    /// Cite/download controls on chapter pages
    pub chapter: ControlSelectors,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            item_selectors: vec![
                r#"h3.c-card__title a[href*="/article/"]"#.to_string(),
                r#"a.c-card__link[href*="/article/"]"#.to_string(),
                r#"a.app-card-open__link[href*="/article/"] span"#.to_string(),
                r#"a.app-card-open__link[href*="/chapter/"] span"#.to_string(),
            ],
            item_path_markers: vec!["/article/".to_string(), "/chapter/".to_string()],
            next_page_selector: r#"a[data-test="next-page"]"#.to_string(),
            disabled_class: "disabled".to_string(),
            total_selector: r#"span[data-test="results-data-total"]"#.to_string(),
            total_pattern: r"of ([\d,]+) results".to_string(),
            article: ControlSelectors {
                cite: r##"a[href="#citeas"][data-track-action="cite this article"]"##.to_string(),
                download: r#"a[data-test="citation-link"][data-track-action="download article citation"]"#
                    .to_string(),
            },
            chapter: ControlSelectors {
                cite: r##"a[href="#citeas"][data-track-action="cite this chapter"]"##.to_string(),
                download: r#"a[data-test="citation-link"][data-track-action="download chapter citation"]"#
                    .to_string(),
            },
        }
    }
}

/// The two controls clicked in sequence to obtain a citation file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ControlSelectors {
    /// Opens the citation panel
    pub cite: String,

    /// Triggers the citation file download
    pub download: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite state database
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Directory receiving downloaded citation files
    #[serde(rename = "download-dir")]
    pub download_dir: String,

    /// Numbered title list written when a crawl completes
    #[serde(rename = "titles-path")]
    pub titles_path: String,

    /// Merged citation bundle
    #[serde(rename = "merged-path")]
    pub merged_path: String,

    /// Plain-text verification report
    #[serde(rename = "report-path")]
    pub report_path: String,
}
