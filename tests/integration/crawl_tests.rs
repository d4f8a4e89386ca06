//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run full mirror
//! runs end-to-end into temporary output directories.

use docs_mirror::config::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use docs_mirror::output::RunStatus;
use docs_mirror::{Coordinator, MirrorError, WriteError};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a mock server and the given seed paths
fn create_test_config(server: &MockServer, root: &Path, seeds: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 2,
            minimum_delay_ms: 0,
            max_retries: 2,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 5,
            request_timeout_secs: 5,
            respect_robots: false,
            shutdown_grace_secs: 1,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            root: root.display().to_string(),
            manifest_path: None,
            on_this_page: false,
        },
        site: SiteConfig {
            name: "Test Docs".to_string(),
            seeds: seeds
                .iter()
                .map(|p| format!("{}{}", server.uri(), p))
                .collect(),
            allowed_hosts: vec![],
            include_prefixes: vec![],
            exclude_prefixes: vec![],
            content_selectors: vec![],
            chrome_selectors: vec![],
            roles: vec![],
        },
    }
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><nav><a href=\"/nav\">Nav</a></nav><main>{}</main></body></html>",
            title, body
        ),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, at: &str, title: &str, body: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html_page(title, body))
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cycle_with_fragment_link() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/p1",
        "Page One",
        r##"<h2 id="intro">Intro</h2><p>See <a href="/p2">page two</a> and <a href="/p1#frag">this</a>.</p>"##,
        1,
    )
    .await;
    mount_page(
        &server,
        "/p2",
        "Page Two",
        r##"<p>Back to <a href="/p1">page one</a> or <a href="#top">top</a>.</p>"##,
        1,
    )
    .await;

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.discovered, 2);
    assert_eq!(manifest.written, 2);
    assert!(manifest.failed.is_empty());

    let p1 = fs::read_to_string(out.path().join("p1.md")).unwrap();
    assert!(p1.starts_with("# Page One | Test Docs\n\n---\n"));
    assert!(p1.contains(&format!("source: {}/p1\n", server.uri())));
    assert!(p1.contains("## Intro"));
    assert!(p1.contains(&format!("[page two]({}/p2)", server.uri())));
    assert!(!p1.contains("Nav"));
    assert!(out.path().join("p2.md").exists());
    assert!(out.path().join("crawl-manifest.json").exists());

    server.verify().await;
}

#[tokio::test]
async fn test_transient_errors_are_retried_to_the_bound() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server, out.path(), &["/flaky"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.written, 0);
    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(manifest.failed[0].error, "HTTP 503");
    assert!(!out.path().join("flaky.md").exists());

    server.verify().await;
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/p1", "Page One", r#"<p><a href="/missing">Gone</a></p>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.written, 1);
    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(manifest.failed[0].url, format!("{}/missing", server.uri()));
    assert_eq!(manifest.failed[0].error, "HTTP 404");

    server.verify().await;
}

#[tokio::test]
async fn test_recrawl_leaves_files_untouched() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/p1", "Page One", r#"<p><a href="/p2">Two</a></p>"#, 2).await;
    mount_page(&server, "/p2", "Page Two", "<p>Leaf</p>", 2).await;

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let first = Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(first.written, 2);
    let before = fs::read_to_string(out.path().join("p1.md")).unwrap();

    let second = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.written, 0);
    assert_eq!(second.unchanged, 2);
    let after = fs::read_to_string(out.path().join("p1.md")).unwrap();
    assert_eq!(before, after);

    server.verify().await;
}

#[tokio::test]
async fn test_redirect_target_becomes_the_record() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri()).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/new", "New Page", r#"<p><a href="/old">Old link</a></p>"#, 1).await;

    let config = create_test_config(&server, out.path(), &["/old"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.discovered, 2);
    assert_eq!(manifest.written, 1);
    assert!(out.path().join("new.md").exists());
    assert!(!out.path().join("old.md").exists());

    server.verify().await;
}

#[tokio::test]
async fn test_page_budget_abandons_the_rest() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/p1", "Page One", r#"<p><a href="/p2">Two</a></p>"#, 1).await;
    mount_page(&server, "/p2", "Page Two", "<p>Leaf</p>", 0).await;

    let mut config = create_test_config(&server, out.path(), &["/p1"]);
    config.crawler.max_pages = Some(1);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::BudgetExhausted);
    assert_eq!(manifest.written, 1);
    assert_eq!(manifest.abandoned, vec![format!("{}/p2", server.uri())]);
    assert!(manifest.failed.is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_robots_disallow() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/p1", "Page One", r#"<p><a href="/private/x">Secret</a></p>"#, 1).await;
    mount_page(&server, "/private/x", "Secret", "<p>Hidden</p>", 0).await;

    let mut config = create_test_config(&server, out.path(), &["/p1"]);
    config.crawler.respect_robots = true;
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.written, 1);
    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(manifest.failed[0].error, "disallowed by robots.txt");

    server.verify().await;
}

#[tokio::test]
async fn test_non_html_is_rejected() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/p1", "Page One", r#"<p><a href="/download">Get it</a></p>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("binary", "application/octet-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(
        manifest.failed[0].error,
        "unsupported content type: application/octet-stream"
    );

    server.verify().await;
}

#[tokio::test]
async fn test_cancelled_run_is_interrupted() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(&server, "/p1", "Page One", "<p>Never fetched</p>", 0).await;

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let coordinator = Coordinator::new(config).unwrap();
    coordinator.cancellation_token().cancel();
    let manifest = coordinator.run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::Interrupted);
    assert_eq!(manifest.abandoned, vec![format!("{}/p1", server.uri())]);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("crawl-manifest.json")).unwrap()).unwrap();
    assert_eq!(json["status"], "interrupted");

    server.verify().await;
}

#[tokio::test]
async fn test_unusable_output_root_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, "x").unwrap();

    let config = create_test_config(&server, &file, &["/p1"]);
    let result = Coordinator::new(config).unwrap().run().await;

    assert!(matches!(
        result,
        Err(MirrorError::Write(WriteError::OutputRoot(_)))
    ));
}

#[tokio::test]
async fn test_write_failure_is_fatal_only_to_that_page() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_page(
        &server,
        "/p1",
        "Page One",
        r#"<p><a href="/p2">Two</a> <a href="/p3">Three</a></p>"#,
        1,
    )
    .await;
    mount_page(&server, "/p2", "Page Two", "<p>Blocked</p>", 1).await;
    mount_page(&server, "/p3", "Page Three", "<p>Fine</p>", 1).await;

    // A directory where the page file should go
    fs::create_dir(out.path().join("p2.md")).unwrap();

    let config = create_test_config(&server, out.path(), &["/p1"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::Completed);
    assert_eq!(manifest.written, 2);
    assert_eq!(manifest.failed.len(), 1);
    assert_eq!(manifest.failed[0].url, format!("{}/p2", server.uri()));
    assert!(manifest.failed[0].error.starts_with("Failed to write"));
    assert!(out.path().join("p3.md").is_file());

    server.verify().await;
}

#[tokio::test]
async fn test_time_budget_ends_the_run() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    for slow in ["/slow1", "/slow2"] {
        Mock::given(method("GET"))
            .and(path(slow))
            .respond_with(html_page("Slow", "<p>Slow</p>").set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, out.path(), &["/slow1", "/slow2"]);
    config.crawler.workers = 1;
    config.crawler.per_host_concurrency = 1;
    config.crawler.request_timeout_secs = 30;
    config.crawler.max_duration_secs = Some(1);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.status, RunStatus::BudgetExhausted);
    assert_eq!(manifest.written, 0);
    assert_eq!(
        manifest.abandoned,
        vec![format!("{}/slow1", server.uri()), format!("{}/slow2", server.uri())]
    );
}

#[tokio::test]
async fn test_empty_page_is_written_with_a_warning() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Blank</title></head><body></body></html>",
            "text/html",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, out.path(), &["/blank"]);
    let manifest = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(manifest.written, 1);
    assert_eq!(manifest.warnings.len(), 1);
    assert_eq!(manifest.warnings[0].url, format!("{}/blank", server.uri()));
    assert_eq!(manifest.warnings[0].message, "content region is empty");

    let text = fs::read_to_string(out.path().join("blank.md")).unwrap();
    assert!(text.starts_with("# Blank | Test Docs\n"));

    server.verify().await;
}
