//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small two-page catalog and run the
//! full harvest cycle end-to-end: discovery, pagination, citation download,
//! the title list, and the merge of what was downloaded.

use cite_harvest::config::{
    AdapterConfig, CatalogConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig,
    UserAgentConfig,
};
use cite_harvest::crawler::{build_coordinator, crawl, CrawlOutcome};
use cite_harvest::merge::{collect_ris_files, merge_files};
use cite_harvest::output::{CollectingSink, ProgressEvent};
use cite_harvest::storage::{open_store, StateStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RIS_ONE: &str = "TY  - JOUR\nTI  - One\nAU  - Doe, J.\nER  - \n";
const RIS_THREE: &str = "TY  - CHAP\nTI  - Three\nAU  - Roe, R.\nER  - \n";

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            inter_item_delay: 5,
            ready_timeout: 2000,
            settle_delay: 5,
            operation_timeout: 10_000,
        },
        extraction: ExtractionConfig {
            max_attempts: 2,
            retry_delay: 5,
            element_timeout: 50,
            poll_interval: 5,
            download_settle: 5,
            request_timeout: 1000,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        catalog: CatalogConfig {
            seed_url: format!("{}/search?page=1", base_url),
        },
        adapter: AdapterConfig::default(),
        output: OutputConfig {
            state_path: dir.join("state.db").display().to_string(),
            download_dir: dir.join("downloads").display().to_string(),
            titles_path: dir.join("titles.txt").display().to_string(),
            merged_path: dir.join("merged.ris").display().to_string(),
            report_path: dir.join("report.txt").display().to_string(),
        },
    }
}

async fn mount_html(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves a two-page catalog: page 1 lists One and Two, page 2 lists Three.
/// Two has no citation controls, so its extraction fails.
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <span data-test="results-data-total">Showing 1-2 of 3 results</span>
                <h3 class="c-card__title"><a href="/article/10.1000/one">One</a></h3>
                <h3 class="c-card__title"><a href="/article/10.1000/two">Two</a></h3>
                <a data-test="next-page" href="/search?page=2">Next</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <a class="app-card-open__link" href="/chapter/10.1000/three"><span>Three</span></a>
                <a data-test="next-page" class="disabled" href="/search?page=3">Next</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    mount_html(
        server,
        "/article/10.1000/one",
        r##"<html><body>
            <a href="#citeas" data-track-action="cite this article">Cite this article</a>
            <a data-test="citation-link" data-track-action="download article citation"
               href="/citation/one.ris">.RIS</a>
        </body></html>"##
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/article/10.1000/two",
        "<html><body><p>Access denied</p></body></html>".to_string(),
    )
    .await;

    mount_html(
        server,
        "/chapter/10.1000/three",
        r##"<html><body>
            <a href="#citeas" data-track-action="cite this chapter">Cite this chapter</a>
            <a data-test="citation-link" data-track-action="download chapter citation"
               href="/citation/three.ris">.RIS</a>
        </body></html>"##
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/citation/one.ris"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RIS_ONE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/citation/three.ris"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RIS_THREE))
        .mount(server)
        .await;
}

async fn setup() -> (MockServer, TempDir, Config) {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = create_test_config(&server.uri(), dir.path());

    (server, dir, config)
}

#[tokio::test]
async fn test_full_harvest_two_pages() {
    let (_server, dir, config) = setup().await;

    let outcome = crawl(&config, None).await.expect("Harvest failed");

    assert_eq!(
        outcome,
        CrawlOutcome::Completed {
            downloaded: 2,
            titles: 3
        }
    );

    let titles = std::fs::read_to_string(dir.path().join("titles.txt")).unwrap();
    assert_eq!(titles, "1. One\n2. Two\n3. Three\n");

    let downloads = dir.path().join("downloads");
    assert_eq!(
        std::fs::read_to_string(downloads.join("article_10.1000_one.ris")).unwrap(),
        RIS_ONE
    );
    assert_eq!(
        std::fs::read_to_string(downloads.join("chapter_10.1000_three.ris")).unwrap(),
        RIS_THREE
    );
}

#[tokio::test]
async fn test_progress_events_and_cleared_state() {
    let (_server, _dir, config) = setup().await;
    let sink = CollectingSink::new();

    let mut coordinator =
        build_coordinator(&config, Arc::new(sink.clone())).expect("Failed to build coordinator");
    coordinator.start(&config.catalog.seed_url).await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        ProgressEvent::Progress {
            current: 1,
            total: 3
        }
    );
    match &events[1] {
        ProgressEvent::Error { message } => assert!(message.contains("Two")),
        other => panic!("Expected an error event, got {:?}", other),
    }
    assert_eq!(
        events[2],
        ProgressEvent::Progress {
            current: 2,
            total: 3
        }
    );
    assert!(events[3].is_complete());

    drop(coordinator);
    let store = open_store(Path::new(&config.output.state_path)).unwrap();
    assert!(store.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_harvest_then_merge() {
    let (_server, dir, config) = setup().await;
    crawl(&config, None).await.unwrap();

    let files = collect_ris_files(Path::new(&config.output.download_dir)).unwrap();
    assert_eq!(files.len(), 2);

    let result = merge_files(
        &files,
        Path::new(&config.output.titles_path),
        Path::new(&config.output.merged_path),
        Path::new(&config.output.report_path),
    )
    .unwrap();

    assert_eq!(result.report.success_count, 2);
    assert_eq!(result.report.expected_count, 3);
    assert_eq!(result.report.missing_titles, vec!["Two".to_string()]);

    let merged = std::fs::read_to_string(dir.path().join("merged.ris")).unwrap();
    assert_eq!(merged, format!("{}\n{}", RIS_ONE, RIS_THREE));

    let report = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(report.contains("Titles without a record (1):\n1. Two"));
}

#[tokio::test]
async fn test_seed_override() {
    let (server, dir, config) = setup().await;
    let page_two = format!("{}/search?page=2", server.uri());

    let outcome = crawl(&config, Some(&page_two)).await.unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Completed {
            downloaded: 1,
            titles: 1
        }
    );
    let titles = std::fs::read_to_string(dir.path().join("titles.txt")).unwrap();
    assert_eq!(titles, "1. Three\n");
}

#[tokio::test]
async fn test_unreachable_seed_completes_with_error() {
    let (server, _dir, config) = setup().await;
    let missing = format!("{}/missing-search", server.uri());
    let sink = CollectingSink::new();

    let mut coordinator = build_coordinator(&config, Arc::new(sink.clone())).unwrap();
    let outcome = coordinator.start(&missing).await.unwrap();

    assert_eq!(
        outcome,
        CrawlOutcome::Completed {
            downloaded: 0,
            titles: 0
        }
    );
    let events = sink.events();
    assert!(matches!(events[0], ProgressEvent::Error { .. }));
    assert_eq!(events.iter().filter(|e| e.is_complete()).count(), 1);
}
