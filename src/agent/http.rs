//! HTTP-backed render agent
//!
//! Each handle is an isolated page context: the document is fetched in its
//! own task and readiness is published on a watch channel, so `wait_ready`
//! resolves on load or failure rather than on a fixed sleep.
//!
//! Controls are interpreted by their `href`: a fragment-only href opens an
//! in-page panel and needs no request, anything else is followed. The
//! download control's target is saved into the download directory as a
//! `.ris` file.

use super::extract::{CitationExtractor, ControlSurface, ExtractionPolicy};
use super::wait::notified_until;
use super::{AgentError, AgentHandle, AgentResult, ExtractionOutcome, RenderAgent};
use crate::adapter::{PageAdapter, SelectorAdapter};
use crate::config::{Config, UserAgentConfig};
use crate::url::{is_fragment_only, resolve_href};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use url::Url;

/// Builds an HTTP client identifying the harvester
///
/// # Example
///
/// ```no_run
/// use cite_harvest::agent::build_http_client;
/// use cite_harvest::config::UserAgentConfig;
///
/// let config = UserAgentConfig {
///     crawler_name: "CiteHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    html: Arc<str>,
}

#[derive(Debug, Clone)]
enum LoadState {
    Loading,
    Ready(LoadedPage),
    Failed(String),
}

impl LoadState {
    fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

struct PageContext {
    state: watch::Receiver<LoadState>,
    task: JoinHandle<()>,
}

/// Render agent that loads pages over HTTP
pub struct HttpRenderAgent {
    client: Client,
    adapter: Arc<dyn PageAdapter>,
    extractor: CitationExtractor,
    download_dir: PathBuf,
    load_timeout: Duration,
    contexts: Mutex<HashMap<AgentHandle, PageContext>>,
    next_id: AtomicU64,
}

impl HttpRenderAgent {
    pub fn new(
        client: Client,
        adapter: Arc<dyn PageAdapter>,
        extractor: CitationExtractor,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            adapter,
            extractor,
            download_dir: download_dir.into(),
            load_timeout: Duration::from_secs(60),
            contexts: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Bounds how long discovery and extraction wait for a page still loading
    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    /// Builds the agent, its client and its selector adapter from configuration
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent)?;
        let adapter = SelectorAdapter::new(&config.adapter)?;
        let extractor = CitationExtractor::new(ExtractionPolicy::from(&config.extraction));

        Ok(Self::new(
            client,
            Arc::new(adapter),
            extractor,
            &config.output.download_dir,
        )
        .with_load_timeout(config.crawler.operation_timeout()))
    }

    /// Number of page contexts currently open
    pub async fn open_contexts(&self) -> usize {
        self.contexts.lock().await.len()
    }

    fn request_timeout(&self) -> Duration {
        self.extractor.policy().request_timeout
    }

    async fn receiver(&self, handle: AgentHandle) -> AgentResult<watch::Receiver<LoadState>> {
        self.contexts
            .lock()
            .await
            .get(&handle)
            .map(|context| context.state.clone())
            .ok_or(AgentError::UnknownHandle(handle))
    }

    async fn loaded_page(&self, handle: AgentHandle) -> AgentResult<LoadedPage> {
        let mut rx = self.receiver(handle).await?;
        let settled = notified_until(&mut rx, self.load_timeout, |s| !s.is_loading()).await;

        // The sender only disappears when the load task was aborted
        if !settled && rx.has_changed().is_err() {
            return Err(AgentError::LoadFailed(format!(
                "{} closed while loading",
                handle
            )));
        }

        let state = rx.borrow().clone();
        match state {
            LoadState::Ready(page) => Ok(page),
            LoadState::Failed(message) => Err(AgentError::LoadFailed(message)),
            LoadState::Loading => Err(AgentError::Timeout {
                operation: "page load",
                after: self.load_timeout,
            }),
        }
    }
}

#[async_trait]
impl RenderAgent for HttpRenderAgent {
    async fn open(&self, url: &Url) -> AgentResult<AgentHandle> {
        let handle = AgentHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = watch::channel(LoadState::Loading);

        let client = self.client.clone();
        let target = url.clone();
        let request_timeout = self.request_timeout();
        let task = tokio::spawn(async move {
            let state = match fetch_page(&client, &target, request_timeout).await {
                Ok(page) => LoadState::Ready(page),
                Err(e) => {
                    tracing::debug!("Load of {} failed: {}", target, e);
                    LoadState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });

        self.contexts
            .lock()
            .await
            .insert(handle, PageContext { state: rx, task });

        tracing::debug!("Opened {} on {}", handle, url);
        Ok(handle)
    }

    async fn wait_ready(&self, handle: AgentHandle) -> AgentResult<()> {
        let mut rx = self.receiver(handle).await?;
        rx.wait_for(|s| !s.is_loading())
            .await
            .map(|_| ())
            .map_err(|_| AgentError::LoadFailed(format!("{} closed while loading", handle)))
    }

    async fn run_discovery(&self, handle: AgentHandle) -> AgentResult<serde_json::Value> {
        let page = self.loaded_page(handle).await?;
        let discovery = self.adapter.discover(&page.html, &page.url);
        Ok(serde_json::to_value(&discovery)?)
    }

    async fn run_extraction(&self, handle: AgentHandle) -> AgentResult<ExtractionOutcome> {
        let page = self.loaded_page(handle).await?;
        let controls = self.adapter.citation_controls(&page.url);
        let surface = HttpPage::new(
            self.client.clone(),
            page,
            self.download_dir.clone(),
            self.request_timeout(),
        );

        Ok(self.extractor.extract(&surface, &controls).await)
    }

    async fn close(&self, handle: AgentHandle) -> AgentResult<()> {
        let context = self
            .contexts
            .lock()
            .await
            .remove(&handle)
            .ok_or(AgentError::UnknownHandle(handle))?;

        context.task.abort();
        tracing::debug!("Closed {}", handle);
        Ok(())
    }
}

async fn fetch_page(client: &Client, url: &Url, timeout: Duration) -> AgentResult<LoadedPage> {
    let navigation = |message: String| AgentError::Navigation {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| navigation(e.to_string()))?
        .error_for_status()
        .map_err(|e| navigation(e.to_string()))?;

    let final_url = response.url().clone();
    let html = response
        .text()
        .await
        .map_err(|e| AgentError::LoadFailed(e.to_string()))?;

    Ok(LoadedPage {
        url: final_url,
        html: Arc::from(html),
    })
}

/// The live document of one extraction
struct HttpPage {
    client: Client,
    item: LoadedPage,
    current: Mutex<LoadedPage>,
    download_dir: PathBuf,
    request_timeout: Duration,
}

impl HttpPage {
    fn new(
        client: Client,
        page: LoadedPage,
        download_dir: PathBuf,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            item: page.clone(),
            current: Mutex::new(page),
            download_dir,
            request_timeout,
        }
    }

    async fn snapshot(&self) -> LoadedPage {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl ControlSurface for HttpPage {
    async fn has_control(&self, selector: &str) -> bool {
        let page = self.snapshot().await;
        control_href(&page.html, selector).is_ok()
    }

    async fn click(&self, selector: &str) -> AgentResult<()> {
        let page = self.snapshot().await;

        let href = match control_href(&page.html, selector)? {
            Some(href) if !is_fragment_only(&href) => href,
            _ => return Ok(()),
        };

        let target = resolve_href(&href, &page.url).ok_or_else(|| AgentError::Navigation {
            url: href.clone(),
            message: "control does not point at an HTTP(S) page".to_string(),
        })?;

        let loaded = fetch_page(&self.client, &target, self.request_timeout).await?;
        *self.current.lock().await = loaded;
        Ok(())
    }

    async fn download(&self, selector: &str) -> AgentResult<()> {
        let page = self.snapshot().await;

        let href = control_href(&page.html, selector)?
            .filter(|href| !is_fragment_only(href))
            .ok_or_else(|| AgentError::Download(format!("{} has no download target", selector)))?;

        let target = resolve_href(&href, &page.url)
            .ok_or_else(|| AgentError::Download(format!("unusable download target {}", href)))?;

        let body = self
            .client
            .get(target.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AgentError::Download(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| AgentError::Download(e.to_string()))?;

        if body.is_empty() {
            return Err(AgentError::Download(format!("{} returned an empty file", target)));
        }

        let path = self.download_dir.join(citation_file_name(&self.item.url));
        write_citation(&path, &body)
            .await
            .map_err(|e| AgentError::Download(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Saved citation for {} to {}", self.item.url, path.display());
        Ok(())
    }

    async fn restore(&self) {
        *self.current.lock().await = self.item.clone();
    }
}

/// Href of the first element matching `selector`
///
/// Returns `ControlNotFound` when nothing matches and `Ok(None)` for a
/// control without an href.
fn control_href(html: &str, selector: &str) -> AgentResult<Option<String>> {
    let not_found = || AgentError::ControlNotFound {
        selector: selector.to_string(),
    };

    let parsed = Selector::parse(selector).map_err(|_| not_found())?;
    let document = Html::parse_document(html);
    let element = document.select(&parsed).next().ok_or_else(not_found)?;

    Ok(element.value().attr("href").map(str::to_string))
}

/// File name for an item's citation, derived from the item URL path
fn citation_file_name(item_url: &Url) -> String {
    let stem: String = item_url
        .path()
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "citation.ris".to_string()
    } else {
        format!("{}.ris", stem)
    }
}

async fn write_citation(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RIS: &str = "TY  - JOUR\nTI  - Alpha\nER  - \n";

    fn agent(download_dir: &Path) -> HttpRenderAgent {
        let client = build_http_client(&UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        })
        .unwrap();

        let policy = ExtractionPolicy {
            max_attempts: 2,
            retry_delay: Duration::from_millis(5),
            element_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            download_settle: Duration::from_millis(1),
            request_timeout: Duration::from_secs(2),
        };

        HttpRenderAgent::new(
            client,
            Arc::new(SelectorAdapter::new(&AdapterConfig::default()).unwrap()),
            CitationExtractor::new(policy),
            download_dir,
        )
        .with_load_timeout(Duration::from_secs(5))
    }

    fn article_page() -> String {
        r##"<html><body>
            <a href="#citeas" data-track-action="cite this article">Cite</a>
            <a data-test="citation-link" data-track-action="download article citation"
               href="/citation/alpha.ris">Download</a>
        </body></html>"##
            .to_string()
    }

    #[test]
    fn test_citation_file_name() {
        let url = Url::parse("https://example.com/article/10.1000/alpha").unwrap();
        assert_eq!(citation_file_name(&url), "article_10.1000_alpha.ris");

        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(citation_file_name(&root), "citation.ris");
    }

    #[test]
    fn test_control_href() {
        let html = article_page();
        assert_eq!(
            control_href(&html, r##"a[href="#citeas"]"##).unwrap().as_deref(),
            Some("#citeas")
        );
        assert!(matches!(
            control_href(&html, "button.missing"),
            Err(AgentError::ControlNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_discovery_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<h3 class="c-card__title"><a href="/article/10.1/a">A</a></h3>"#,
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();

        let handle = agent.open(&url).await.unwrap();
        agent.wait_ready(handle).await.unwrap();
        let payload = agent.run_discovery(handle).await.unwrap();
        agent.close(handle).await.unwrap();

        assert_eq!(payload["items"][0]["title"], "A");
        assert_eq!(
            payload["items"][0]["url"],
            format!("{}/article/10.1/a", server.uri())
        );
        assert!(payload.get("nextPageUrl").is_none());
        assert_eq!(agent.open_contexts().await, 0);
    }

    #[tokio::test]
    async fn test_extraction_saves_citation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/10.1000/alpha"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_page()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/citation/alpha.ris"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RIS))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let url = Url::parse(&format!("{}/article/10.1000/alpha", server.uri())).unwrap();

        let handle = agent.open(&url).await.unwrap();
        let outcome = agent.run_extraction(handle).await.unwrap();
        agent.close(handle).await.unwrap();

        assert_eq!(outcome, ExtractionOutcome::succeeded());
        let saved =
            std::fs::read_to_string(dir.path().join("article_10.1000_alpha.ris")).unwrap();
        assert_eq!(saved, RIS);
    }

    #[tokio::test]
    async fn test_retry_after_failed_download_starts_from_item_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/10.1000/beta"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <a href="/cite/beta" data-track-action="cite this article">Cite</a>
                </body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cite/beta"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <a data-test="citation-link" data-track-action="download article citation"
                       href="/citation/beta.ris">Download</a>
                </body></html>"#,
            ))
            .mount(&server)
            .await;
        // The first download is refused, the second one succeeds
        Mock::given(method("GET"))
            .and(path("/citation/beta.ris"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/citation/beta.ris"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RIS))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let mut controls = AdapterConfig::default().article;
        controls.cite = r#"a[data-track-action="cite this article"]"#.to_string();

        let url = Url::parse(&format!("{}/article/10.1000/beta", server.uri())).unwrap();
        let page = fetch_page(&agent.client, &url, Duration::from_secs(2))
            .await
            .unwrap();
        let surface = HttpPage::new(
            agent.client.clone(),
            page,
            dir.path().to_path_buf(),
            Duration::from_secs(2),
        );

        let outcome = agent.extractor.extract(&surface, &controls).await;

        assert_eq!(outcome, ExtractionOutcome::succeeded());
        let saved = std::fs::read_to_string(dir.path().join("article_10.1000_beta.ris")).unwrap();
        assert_eq!(saved, RIS);
    }

    #[tokio::test]
    async fn test_extraction_without_controls_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/10.1000/bare"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let url = Url::parse(&format!("{}/article/10.1000/bare", server.uri())).unwrap();

        let handle = agent.open(&url).await.unwrap();
        let outcome = agent.run_extraction(handle).await.unwrap();

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Control not found"));
    }

    #[tokio::test]
    async fn test_failed_load_resolves_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();

        let handle = agent.open(&url).await.unwrap();
        agent.wait_ready(handle).await.unwrap();
        assert!(matches!(
            agent.run_discovery(handle).await,
            Err(AgentError::LoadFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent(dir.path());
        let handle = AgentHandle::new(99);

        assert!(matches!(
            agent.close(handle).await,
            Err(AgentError::UnknownHandle(_))
        ));
        assert!(matches!(
            agent.wait_ready(handle).await,
            Err(AgentError::UnknownHandle(_))
        ));
    }
}
