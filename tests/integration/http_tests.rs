//! Integration tests for the HTTP client

use reqwest::Method;
use std::sync::Mutex;
use visitor::config::HttpOptions;
use visitor::cookies::CookieJar;
use visitor::crawler::{HttpClient, RequestOptions, CODE_CONNECTION_FAILED};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpClient {
    HttpClient::new(&HttpOptions::default()).expect("Failed to build client")
}

fn follow(max_redirects: u32) -> RequestOptions {
    RequestOptions {
        method: Method::GET,
        follow_redirects: true,
        max_redirects,
    }
}

/// Mounts a redirect from `from` to `to`
async fn redirect(server: &MockServer, code: u16, from: &str, to: &str) {
    Mock::given(path(from))
        .respond_with(ResponseTemplate::new(code).insert_header("location", to))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_status_codes_are_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>hello</p>", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client();

    let ok = client
        .request(&format!("{}/ok", server.uri()), &RequestOptions::default(), None)
        .await;
    assert_eq!(ok.code, 200);
    assert!(ok.error.is_none());
    assert!(ok.is_html());
    assert_eq!(ok.body, "<p>hello</p>");
    assert_eq!(ok.header("status"), ["HTTP/1.1 200 OK".to_string()]);

    let missing = client
        .request(&format!("{}/missing", server.uri()), &RequestOptions::default(), None)
        .await;
    assert_eq!(missing.code, 404);
    assert!(missing.error.is_none());
}

#[tokio::test]
async fn test_redirect_chain_within_limit() {
    let server = MockServer::start().await;
    redirect(&server, 301, "/start", "/step").await;
    redirect(&server, 302, "/step", "/end").await;

    Mock::given(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let response = client()
        .request(&format!("{}/start", server.uri()), &follow(2), None)
        .await;

    assert_eq!(response.code, 200);
    assert_eq!(response.redirects, 2);
    assert_eq!(response.url, format!("{}/end", server.uri()));
    assert_eq!(response.body, "done");
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_redirect_chain_over_limit() {
    let server = MockServer::start().await;
    redirect(&server, 301, "/r0", "/r1").await;
    redirect(&server, 301, "/r1", "/r2").await;
    redirect(&server, 301, "/r2", "/r3").await;

    Mock::given(path("/r3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let options = HttpOptions {
        max_redirects: 2,
        ..HttpOptions::default()
    };
    let client = HttpClient::new(&options).expect("Failed to build client");

    let start = format!("{}/r0", server.uri());
    let response = client
        .request(&start, &client.follow_options(Method::HEAD), None)
        .await;

    assert_eq!(response.code, 301);
    assert!(response.is_redirect);
    assert_eq!(response.error.as_ref().map(|e| e.key()), Some("too_many_redirects"));
    assert_eq!(response.follow_target(), None);
}

#[tokio::test]
async fn test_single_exchange_does_not_follow() {
    let server = MockServer::start().await;
    redirect(&server, 307, "/moved", "http://elsewhere.example.com/new").await;

    let response = client()
        .request(
            &format!("{}/moved", server.uri()),
            &RequestOptions::single(Method::GET),
            None,
        )
        .await;

    assert_eq!(response.code, 307);
    assert_eq!(
        response.redirect_url.as_deref(),
        Some("http://elsewhere.example.com/new")
    );
    assert_eq!(response.follow_target(), Some("http://elsewhere.example.com/new"));
}

#[tokio::test]
async fn test_repeated_headers_are_folded() {
    let server = MockServer::start().await;

    Mock::given(path("/cookies"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "first=1; Path=/")
                .append_header("set-cookie", "second=2; Path=/"),
        )
        .mount(&server)
        .await;

    let response = client()
        .request(&format!("{}/cookies", server.uri()), &RequestOptions::default(), None)
        .await;

    assert_eq!(response.header("Set-Cookie").len(), 2);
    assert_eq!(response.cookies.len(), 2);
    assert_eq!(response.cookies[0].name, "first");
    assert_eq!(response.cookies[1].name, "second");
}

#[tokio::test]
async fn test_user_agent_and_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(path("/private"))
        .and(header("user-agent", "visitor-test/1.0"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let options = HttpOptions {
        user_agent: "visitor-test/1.0".to_string(),
        auth: Some("user:pass".to_string()),
        ..HttpOptions::default()
    };
    let client = HttpClient::new(&options).expect("Failed to build client");

    let response = client
        .request(&format!("{}/private", server.uri()), &RequestOptions::default(), None)
        .await;
    assert_eq!(response.code, 200);
}

#[tokio::test]
async fn test_cookies_are_sent_back() {
    let server = MockServer::start().await;

    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "session=abc123; Path=/"))
        .mount(&server)
        .await;

    Mock::given(path("/account"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome back"))
        .expect(1)
        .mount(&server)
        .await;

    let jar = Mutex::new(CookieJar::new());
    let client = client();

    client
        .request(&format!("{}/login", server.uri()), &RequestOptions::default(), Some(&jar))
        .await;
    assert_eq!(jar.lock().unwrap().len(), 1);

    let response = client
        .request(&format!("{}/account", server.uri()), &RequestOptions::default(), Some(&jar))
        .await;
    assert_eq!(response.body, "welcome back");
}

#[tokio::test]
async fn test_head_has_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;

    let response = client()
        .request(
            &format!("{}/page", server.uri()),
            &RequestOptions::single(Method::HEAD),
            None,
        )
        .await;

    assert_eq!(response.code, 200);
    assert_eq!(response.method, Method::HEAD);
    assert!(response.body.is_empty());
    assert!(response.is_html());
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind a port, then free it so nothing is listening there
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let response = client()
        .request(&format!("http://{}/", addr), &RequestOptions::default(), None)
        .await;

    assert_eq!(response.code, CODE_CONNECTION_FAILED);
    assert_eq!(response.error.as_ref().map(|e| e.key()), Some("connection_failed"));
}
