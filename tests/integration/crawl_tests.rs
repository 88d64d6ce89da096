//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::sync::Arc;
use std::time::Duration;
use visitor::config::{ExcludeRule, Options};
use visitor::output::{EventKind, LogEvent, MemorySink};
use visitor::state::VisitState;
use visitor::CrawlSession;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Options suited to a local mock server
fn test_options() -> Options {
    Options {
        time_limit: 30,
        ..Options::default()
    }
}

/// Mounts an HTML page answering both HEAD and GET
async fn mount_page(server: &MockServer, page: &str, body: &str, expected_heads: u64) {
    Mock::given(method("HEAD"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(expected_heads)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Mounts a non-HTML resource answering HEAD
async fn mount_asset(server: &MockServer, asset: &str, expected_heads: u64) {
    Mock::given(method("HEAD"))
        .and(path(asset))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(expected_heads)
        .mount(server)
        .await;
}

async fn run_crawl(start_url: &str, options: Options) -> (CrawlSession, Vec<LogEvent>) {
    let sink = Arc::new(MemorySink::new());
    let mut session =
        CrawlSession::new(start_url, options, sink.clone()).expect("Failed to create session");
    session.run().await;
    (session, sink.events())
}

fn visited_urls(events: &[LogEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.kind == EventKind::Visit)
        .filter_map(|event| event.record().map(|record| record.url.clone()))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><link rel="stylesheet" href="/style.css"></head><body>
            <a href="/page1">Page 1</a>
            <a href="page2">Page 2</a>
            <img src="/logo.png">
            </body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/page1", r#"<a href="/">Home</a><a href="/page2">2</a>"#, 1).await;
    mount_page(&server, "/page2", r#"<a href="/page1">1</a>"#, 1).await;
    mount_asset(&server, "/style.css", 1).await;
    mount_asset(&server, "/logo.png", 1).await;

    let (session, events) = run_crawl(&base, test_options()).await;

    let visits = visited_urls(&events);
    assert_eq!(
        visits,
        vec![
            format!("{}/", base),
            format!("{}/style.css", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
            format!("{}/logo.png", base),
        ]
    );
    assert_eq!(session.visited().len(), 5);

    let page2 = events
        .iter()
        .filter_map(LogEvent::record)
        .find(|record| record.url == format!("{}/page2", base))
        .expect("page2 was not visited");
    assert_eq!(page2.parents, vec![format!("{}/", base)]);
    assert!(page2.is_internal);

    let stats = session.stats();
    assert_eq!(stats.visits, 5);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.enqueued, 5);
}

#[tokio::test]
async fn test_parallel_workers_visit_each_url_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="/item{}">{}</a><a href="/item{}#again">again</a>"#, i, i, i))
        .collect();
    mount_page(&server, "/", &links, 1).await;
    for i in 1..=6 {
        mount_asset(&server, &format!("/item{}", i), 1).await;
    }

    let mut options = test_options();
    options.workers = 4;
    let (session, events) = run_crawl(&base, options).await;

    assert_eq!(visited_urls(&events).len(), 7);
    assert_eq!(session.visited().len(), 7);
}

#[tokio::test]
async fn test_parallel_redirects_to_same_target_fetch_it_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#, 1).await;
    for from in ["/a", "/b"] {
        Mock::given(path(from))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/t"))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("HEAD"))
        .and(path("/t"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut options = test_options();
    options.workers = 4;
    let (session, events) = run_crawl(&base, options).await;

    let target = format!("{}/t", base);
    let visits_of_target = visited_urls(&events)
        .iter()
        .filter(|url| **url == target)
        .count();
    assert_eq!(visits_of_target, 1);
    assert_eq!(session.visited()[&target].state, VisitState::Visited);
}

#[tokio::test]
async fn test_head_refused_falls_back_to_get() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"<a href="/next">next</a>"#, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    mount_asset(&server, "/next", 1).await;

    let (_, events) = run_crawl(&server.uri(), test_options()).await;

    let visits: Vec<_> = events.iter().filter_map(LogEvent::record).collect();
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].code, 200);
    assert_eq!(visits[1].url, format!("{}/next", server.uri()));
}

#[tokio::test]
async fn test_redirect_chain_is_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/moved"))
        .mount(&server)
        .await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/final"))
        .mount(&server)
        .await;
    mount_page(&server, "/final", "<p>no links</p>", 1).await;

    let (session, events) = run_crawl(&base, test_options()).await;

    let kinds: Vec<EventKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![EventKind::Redirect, EventKind::Redirect, EventKind::Visit]);

    let first = events[0].record().unwrap();
    assert_eq!(first.redirect_url, Some(format!("{}/moved", base)));
    assert_eq!(events[2].record().unwrap().url, format!("{}/final", base));

    assert_eq!(
        session.visited()[&format!("{}/", base)].state,
        VisitState::Redirected
    );
    assert_eq!(
        session.visited()[&format!("{}/final", base)].state,
        VisitState::Visited
    );
}

#[tokio::test]
async fn test_too_many_redirects() {
    let server = MockServer::start().await;

    for i in 0..5 {
        let from = if i == 0 { "/".to_string() } else { format!("/r{}", i) };
        let to = format!("/r{}", i + 1);
        Mock::given(path(from.as_str()))
            .respond_with(ResponseTemplate::new(301).insert_header("location", to.as_str()))
            .mount(&server)
            .await;
    }

    let mut options = test_options();
    options.request_max_redirects = 2;
    let (_, events) = run_crawl(&server.uri(), options).await;

    let redirects = events.iter().filter(|e| e.kind == EventKind::Redirect).count();
    assert_eq!(redirects, 3);

    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Error);
    assert_eq!(last.key(), Some("too_many_redirects"));
}

#[tokio::test]
async fn test_redirect_loop_is_detected() {
    let server = MockServer::start().await;

    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .mount(&server)
        .await;

    let (_, events) = run_crawl(&server.uri(), test_options()).await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[2].key(), Some("infinite_loop"));
}

#[tokio::test]
async fn test_time_limit_halts_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"<a href="/never">never</a>"#, "text/html"))
        .mount(&server)
        .await;
    mount_asset(&server, "/never", 0).await;

    let mut options = test_options();
    options.time_limit = 1;

    let sink = Arc::new(MemorySink::new());
    let mut session = CrawlSession::new(&server.uri(), options, sink.clone()).unwrap();
    let report = session.run().await;

    assert!(!report.completed());
    let events = sink.events();
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Error);
    assert_eq!(last.key(), Some("time_limit_reached"));
    assert!(last
        .message()
        .unwrap()
        .starts_with("Time limit of 1 seconds was reached"));
}

#[tokio::test]
async fn test_unreachable_host() {
    let mut options = test_options();
    options.http.connection_timeout = 1;

    let (session, events) = run_crawl("http://10.255.255.1/", options).await;

    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Error);
    assert!(matches!(
        last.key(),
        Some("connection_timedout") | Some("connection_failed")
    ));
    assert_eq!(
        session.visited()["http://10.255.255.1/"].state,
        VisitState::Errored
    );
}

#[tokio::test]
async fn test_cookies_flow_and_jar_is_written() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let jar_path = dir.path().join("cookies.json");

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"<a href="/members">members</a>"#, "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/members"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/plain"))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = test_options();
    options.cookiejar = Some(jar_path.clone());
    let (session, events) = run_crawl(&server.uri(), options).await;

    assert_eq!(visited_urls(&events).len(), 2);
    assert_eq!(session.cookie_jar().len(), 1);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&jar_path).unwrap()).unwrap();
    let cookies = written.as_array().unwrap();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0]["name"], "session");
    assert_eq!(cookies[0]["value"], "abc");
    assert_eq!(cookies[0]["path"], "/");
}

#[tokio::test]
async fn test_cookiejar_write_failure_is_a_warning() {
    let server = MockServer::start().await;
    mount_asset(&server, "/", 1).await;

    let mut options = test_options();
    options.cookiejar = Some("/nonexistent-visitor-dir/deeper/jar.json".into());
    let (_, events) = run_crawl(&server.uri(), options).await;

    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Warning);
    assert_eq!(last.key(), Some("cookiejar_write_error"));
}

#[tokio::test]
async fn test_disabled_cookies_are_not_sent() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .insert_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = test_options();
    options.cookies_enabled = false;
    let (session, _) = run_crawl(&server.uri(), options).await;

    assert!(session.cookie_jar().is_empty());
}

#[tokio::test]
async fn test_external_links_not_allowed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="http://external.invalid/page">out</a><a href="/inside">in</a>"#,
        1,
    )
    .await;
    mount_asset(&server, "/inside", 1).await;

    let mut options = test_options();
    options.allow_external = false;
    let (_, events) = run_crawl(&base, options).await;

    assert_eq!(
        visited_urls(&events),
        vec![format!("{}/", base), format!("{}/inside", base)]
    );
    assert!(events.iter().all(|event| event.kind == EventKind::Visit));
}

#[tokio::test]
async fn test_exclude_rules() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/private/area">p</a><a href="/public">q</a>
           <a href="http://ads.example.invalid/banner">ad</a>"#,
        1,
    )
    .await;
    mount_asset(&server, "/private/area", 0).await;
    mount_asset(&server, "/public", 1).await;

    let mut options = test_options();
    options.exclude = vec![
        ExcludeRule::Regex {
            regex: "/private/".to_string(),
        },
        ExcludeRule::Domain {
            domain: "*.example.invalid".to_string(),
        },
    ];
    let (_, events) = run_crawl(&base, options).await;

    assert_eq!(
        visited_urls(&events),
        vec![format!("{}/", base), format!("{}/public", base)]
    );
}

#[tokio::test]
async fn test_external_pages_are_not_crawled() {
    let internal = MockServer::start().await;
    let external = MockServer::start().await;

    // Same address, reached through a different host name
    let external_base = external.uri().replace("127.0.0.1", "localhost");

    mount_page(
        &internal,
        "/",
        &format!(r#"<a href="{}/landing">partner</a>"#, external_base),
        1,
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&external)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"<a href="/deeper">deeper</a>"#, "text/html"))
        .expect(0)
        .mount(&external)
        .await;

    let (_, events) = run_crawl(&internal.uri(), test_options()).await;

    let records: Vec<_> = events.iter().filter_map(LogEvent::record).collect();
    assert_eq!(records.len(), 2);
    assert!(records[0].is_internal);
    assert!(!records[1].is_internal);
    assert_eq!(records[1].url, format!("{}/landing", external_base));
}

#[tokio::test]
async fn test_invalid_start_url_is_rejected() {
    let sink = Arc::new(MemorySink::new());
    assert!(CrawlSession::new("ftp://example.com/", Options::default(), sink.clone()).is_err());
    assert!(CrawlSession::new("/relative/only", Options::default(), sink.clone()).is_err());
    assert!(sink.is_empty());
}
