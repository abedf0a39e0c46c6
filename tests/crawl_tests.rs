//! Integration tests for the crawler service
//!
//! These tests use wiremock to stand in for crawled sites and drive the
//! full cycle end-to-end: queued item -> scheduler -> worker -> fetch ->
//! analysis -> persisted result -> terminal status.

use pagelens::config::CrawlerConfig;
use pagelens::crawler::CrawlerService;
use pagelens::state::CrawlStatus;
use pagelens::storage::{CrawlItem, SqliteStorage, Storage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast-polling configuration so tests finish in seconds
fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        worker_count: 2,
        queue_capacity: 10,
        poll_interval_secs: 1,
        request_timeout_secs: 5,
        connect_timeout_secs: 5,
        probe_timeout_secs: 5,
        probe_concurrency: 4,
    }
}

/// Opens a file-backed store in a temporary directory
fn test_storage(dir: &TempDir) -> Arc<Mutex<SqliteStorage>> {
    let db_path = dir.path().join("pagelens.db");
    Arc::new(Mutex::new(SqliteStorage::new(&db_path).unwrap()))
}

/// Polls until the item reaches a terminal status
async fn wait_for_terminal(storage: &Arc<Mutex<SqliteStorage>>, id: i64) -> CrawlItem {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        let item = { storage.lock().unwrap().get_item(id).unwrap() };
        if item.status.is_terminal() {
            return item;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "item {} stuck in {:?}",
            id,
            item.status
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_full_cycle_completes_item() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    // Page with one live internal link, one live external link (localhost
    // is a different hostname than 127.0.0.1), and one dead internal link.
    let body = format!(
        r#"<!DOCTYPE html><html><head><title>Home</title></head><body>
        <h1>Welcome</h1><h2>Sub</h2>
        <a href="/about">about</a>
        <a href="http://localhost:{}/ext">external</a>
        <a href="/gone">gone</a>
        </body></html>"#,
        port
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let item = {
        let mut storage = storage.lock().unwrap();
        storage.create_item(&format!("{}/", server.uri())).unwrap()
    };
    assert_eq!(item.status, CrawlStatus::Queued);

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();

    let finished = wait_for_terminal(&storage, item.id).await;
    service.stop().await;

    assert_eq!(finished.status, CrawlStatus::Completed);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());
    assert_eq!(finished.error_message, None);

    let storage = storage.lock().unwrap();
    let analysis = storage.get_analysis(item.id).unwrap().unwrap();
    assert_eq!(analysis.html_version.as_deref(), Some("html"));
    assert_eq!(analysis.page_title.as_deref(), Some("Home"));
    assert_eq!(analysis.h1_count, 1);
    assert_eq!(analysis.h2_count, 1);
    assert_eq!(analysis.internal_links_count, 2);
    assert_eq!(analysis.external_links_count, 1);
    assert_eq!(analysis.broken_links_count, 1);
    assert!(!analysis.has_login_form);

    let broken = storage.get_broken_links(item.id).unwrap();
    assert_eq!(broken.len(), 1);
    assert!(broken[0].link_url.ends_with("/gone"));
    assert_eq!(broken[0].status_code, Some(404));
}

#[tokio::test]
async fn test_dead_external_link_in_both_lists() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();

    let body = format!(
        r#"<html><body><a href="http://localhost:{}/missing">x</a></body></html>"#,
        port
    );
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let item = {
        let mut storage = storage.lock().unwrap();
        storage.create_item(&format!("{}/", server.uri())).unwrap()
    };

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();
    let finished = wait_for_terminal(&storage, item.id).await;
    service.stop().await;

    assert_eq!(finished.status, CrawlStatus::Completed);

    let storage = storage.lock().unwrap();
    let analysis = storage.get_analysis(item.id).unwrap().unwrap();
    // The dead link is still counted as external; it also shows up broken
    assert_eq!(analysis.external_links_count, 1);
    assert_eq!(analysis.broken_links_count, 1);
}

#[tokio::test]
async fn test_fetch_failure_marks_item_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let item = {
        let mut storage = storage.lock().unwrap();
        storage.create_item(&format!("{}/", server.uri())).unwrap()
    };

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();
    let finished = wait_for_terminal(&storage, item.id).await;
    service.stop().await;

    assert_eq!(finished.status, CrawlStatus::Failed);
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());
    assert_eq!(finished.error_message.as_deref(), Some("HTTP 500"));

    // No analysis artifacts on failure
    let storage = storage.lock().unwrap();
    assert!(storage.get_analysis(item.id).unwrap().is_none());
    assert!(storage.get_broken_links(item.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_rerun_recovers_failed_item() {
    let server = MockServer::start().await;
    // No GET mock mounted: wiremock answers 404 and the first crawl fails

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let item = {
        let mut storage = storage.lock().unwrap();
        storage.create_item(&format!("{}/", server.uri())).unwrap()
    };

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();

    let failed = wait_for_terminal(&storage, item.id).await;
    assert_eq!(failed.status, CrawlStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("HTTP 404"));

    // Bring the page up, then reset the item; the running service picks
    // it up again on the next polling cycle.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Back</title></head></html>"),
        )
        .mount(&server)
        .await;

    {
        let mut storage = storage.lock().unwrap();
        storage.reset_for_rerun(item.id).unwrap();
        let reset = storage.get_item(item.id).unwrap();
        assert_eq!(reset.status, CrawlStatus::Queued);
        assert_eq!(reset.started_at, None);
        assert_eq!(reset.completed_at, None);
        assert_eq!(reset.error_message, None);
    }

    let finished = wait_for_terminal(&storage, item.id).await;
    service.stop().await;

    assert_eq!(finished.status, CrawlStatus::Completed);
    assert_eq!(finished.error_message, None);

    let storage = storage.lock().unwrap();
    let analysis = storage.get_analysis(item.id).unwrap().unwrap();
    assert_eq!(analysis.page_title.as_deref(), Some("Back"));
}

#[tokio::test]
async fn test_multiple_items_all_complete() {
    let server = MockServer::start().await;
    for page in ["/a", "/b", "/c"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html><h1>{}</h1></html>", page)),
            )
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let ids: Vec<i64> = {
        let mut storage = storage.lock().unwrap();
        ["/a", "/b", "/c"]
            .iter()
            .map(|page| {
                storage
                    .create_item(&format!("{}{}", server.uri(), page))
                    .unwrap()
                    .id
            })
            .collect()
    };

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();
    for id in &ids {
        let finished = wait_for_terminal(&storage, *id).await;
        assert_eq!(finished.status, CrawlStatus::Completed);
    }
    service.stop().await;

    let storage = storage.lock().unwrap();
    assert_eq!(
        storage.count_by_status(CrawlStatus::Completed).unwrap(),
        3
    );
    assert_eq!(storage.count_by_status(CrawlStatus::Queued).unwrap(), 0);
}

#[tokio::test]
async fn test_small_queue_defers_and_drains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><p>ok</p></html>"))
        .mount(&server)
        .await;

    // Queue capacity of one: most items are deferred to later polling
    // cycles instead of being admitted on the first pass.
    let config = CrawlerConfig {
        worker_count: 1,
        queue_capacity: 1,
        ..test_config()
    };

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);
    let ids: Vec<i64> = {
        let mut storage = storage.lock().unwrap();
        (0..5)
            .map(|n| {
                storage
                    .create_item(&format!("{}/page{}", server.uri(), n))
                    .unwrap()
                    .id
            })
            .collect()
    };

    let mut service = CrawlerService::new(config, storage.clone()).unwrap();
    service.start();
    for id in &ids {
        let finished = wait_for_terminal(&storage, *id).await;
        assert_eq!(finished.status, CrawlStatus::Completed);
    }
    service.stop().await;
}

#[tokio::test]
async fn test_items_survive_service_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><p>ok</p></html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storage = test_storage(&dir);

    // Item created while no service is running stays queued in storage
    let item = {
        let mut storage = storage.lock().unwrap();
        storage.create_item(&format!("{}/", server.uri())).unwrap()
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    {
        let storage = storage.lock().unwrap();
        assert_eq!(
            storage.get_item(item.id).unwrap().status,
            CrawlStatus::Queued
        );
    }

    let mut service = CrawlerService::new(test_config(), storage.clone()).unwrap();
    service.start();
    let finished = wait_for_terminal(&storage, item.id).await;
    service.stop().await;

    assert_eq!(finished.status, CrawlStatus::Completed);
}
