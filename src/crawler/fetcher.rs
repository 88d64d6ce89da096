//! HTTP client implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the reqwest client from the HTTP options
//! - Sending matching cookies and importing received ones
//! - Folding repeated headers into value lists
//! - Following redirects manually with a hop bound
//! - Classifying transport failures

use crate::config::HttpOptions;
use crate::cookies::{Cookie, CookieJar};
use crate::url::{resolve_relative, ParsedUrl};
use crate::CrawlError;
use reqwest::{header, redirect::Policy, Client, Method, Response};
use std::collections::BTreeMap;
use std::error::Error as _;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Pseudo status code for a connection that timed out
pub const CODE_CONNECTION_TIMEDOUT: i32 = -1;

/// Pseudo status code for any other transport failure
pub const CODE_CONNECTION_FAILED: i32 = 0;

/// Status codes treated as redirects
pub const REDIRECT_CODES: [i32; 4] = [301, 302, 303, 307];

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            follow_redirects: true,
            max_redirects: 15,
        }
    }
}

impl RequestOptions {
    /// A single exchange with the given method, redirects not followed
    pub fn single(method: Method) -> Self {
        Self {
            method,
            follow_redirects: false,
            ..Self::default()
        }
    }
}

/// Outcome of an HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Absolute URL that was requested last
    pub url: String,

    pub method: Method,

    /// Status code, or one of the negative/zero sentinels on transport errors
    pub code: i32,

    pub body: String,

    pub content_type: Option<String>,

    /// Lowercased header names mapped to every value received, plus a
    /// `status` entry holding the status line
    pub headers: BTreeMap<String, Vec<String>>,

    pub is_redirect: bool,

    /// Absolute target of a redirect
    pub redirect_url: Option<String>,

    /// Cookies received in this response
    pub cookies: Vec<Cookie>,

    pub error: Option<CrawlError>,

    /// Redirect hops followed to reach this response
    pub redirects: u32,
}

impl HttpResponse {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: Method::GET,
            code: CODE_CONNECTION_FAILED,
            body: String::new(),
            content_type: None,
            headers: BTreeMap::new(),
            is_redirect: false,
            redirect_url: None,
            cookies: Vec::new(),
            error: None,
            redirects: 0,
        }
    }

    /// Returns every value received for a header
    pub fn header(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the redirect target when this response should be followed
    pub fn follow_target(&self) -> Option<&str> {
        if self.is_redirect && self.error.is_none() {
            self.redirect_url.as_deref()
        } else {
            None
        }
    }

    /// Returns true if the content type announces an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim_start().to_lowercase().starts_with("text/html"))
            .unwrap_or(false)
    }
}

/// HTTP client shared by every request of a crawl
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    options: HttpOptions,
}

impl HttpClient {
    /// Builds a client from the HTTP options
    ///
    /// Redirects are never followed by reqwest itself so every hop can be
    /// observed, counted and given the cookies that match it.
    pub fn new(options: &HttpOptions) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .connect_timeout(Duration::from_secs(options.connection_timeout))
            .redirect(Policy::none())
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            options: options.clone(),
        })
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// Request options following redirects up to the configured bound
    pub fn follow_options(&self, method: Method) -> RequestOptions {
        RequestOptions {
            method,
            follow_redirects: true,
            max_redirects: self.options.max_redirects,
        }
    }

    /// Performs a request, following redirects when asked to
    ///
    /// When a redirect arrives after `max_redirects` hops have been followed,
    /// the redirect response is returned with a `TooManyRedirects` error.
    pub async fn request(
        &self,
        url: &str,
        options: &RequestOptions,
        jar: Option<&Mutex<CookieJar>>,
    ) -> HttpResponse {
        let mut current = url.to_string();
        let mut hops = 0;

        loop {
            let mut response = self.exchange(&current, &options.method, jar).await;
            response.redirects = hops;

            if !options.follow_redirects {
                return response;
            }

            let Some(target) = response.follow_target().map(str::to_string) else {
                return response;
            };

            if hops >= options.max_redirects {
                response.error = Some(CrawlError::TooManyRedirects {
                    url: url.to_string(),
                });
                return response;
            }

            debug!("Following redirect {} -> {}", current, target);
            hops += 1;
            current = target;
        }
    }

    /// Performs exactly one HTTP exchange
    pub async fn exchange(
        &self,
        url: &str,
        method: &Method,
        jar: Option<&Mutex<CookieJar>>,
    ) -> HttpResponse {
        let mut response = HttpResponse::new(url);
        response.method = method.clone();

        let parsed = match ParsedUrl::parse(url) {
            Ok(parsed) if parsed.is_absolute() => parsed,
            _ => {
                response.error = Some(CrawlError::MalformedUrl {
                    url: url.to_string(),
                });
                return response;
            }
        };
        response.url = parsed.assemble();

        let now = chrono::Utc::now().timestamp();
        let mut request = self.client.request(method.clone(), response.url.as_str());

        if let Some(jar) = jar {
            if let Some(cookie_header) = lock(jar).header_for(&parsed, now) {
                request = request.header(header::COOKIE, cookie_header);
            }
        }

        if let Some((user, pass)) = self.options.credentials() {
            request = request.basic_auth(user, pass);
        }

        debug!("{} {}", method, response.url);
        let reply = match request.send().await {
            Ok(reply) => reply,
            Err(e) => {
                classify_transport_error(&mut response, &e);
                return response;
            }
        };

        response.code = i32::from(reply.status().as_u16());
        response.headers = fold_headers(&reply);
        response.content_type = response.header("content-type").first().cloned();
        response.is_redirect = REDIRECT_CODES.contains(&response.code);

        if response.is_redirect {
            response.redirect_url = response
                .header("location")
                .first()
                .and_then(|location| resolve_relative(location, &parsed).ok())
                .map(|target| target.assemble());
        }

        response.cookies = response
            .header("set-cookie")
            .iter()
            .filter_map(|raw| Cookie::parse(raw, &parsed))
            .collect();

        if let Some(jar) = jar {
            if !response.cookies.is_empty() {
                lock(jar).import_response_cookies(response.cookies.iter().cloned(), now);
            }
        }

        if *method != Method::HEAD {
            match reply.text().await {
                Ok(body) => response.body = body,
                Err(e) => {
                    response.error = Some(CrawlError::ConnectionFailed {
                        url: response.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        response
    }
}

/// Collects response headers into lowercased multivalue lists
fn fold_headers(reply: &Response) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in reply.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_lowercase())
            .or_default()
            .push(value);
    }

    headers
        .entry("status".to_string())
        .or_insert_with(|| vec![format!("{:?} {}", reply.version(), reply.status())]);

    headers
}

fn classify_transport_error(response: &mut HttpResponse, e: &reqwest::Error) {
    debug!("Request to {} failed: {}", response.url, e);
    record_transport_failure(response, is_timeout(e), e.to_string());
}

/// Sets the sentinel code and error of a failed exchange
fn record_transport_failure(response: &mut HttpResponse, timed_out: bool, reason: String) {
    if timed_out {
        response.code = CODE_CONNECTION_TIMEDOUT;
        response.error = Some(CrawlError::ConnectionTimedOut {
            url: response.url.clone(),
        });
    } else {
        response.code = CODE_CONNECTION_FAILED;
        response.error = Some(CrawlError::ConnectionFailed {
            url: response.url.clone(),
            reason,
        });
    }
}

/// Detects timeouts reported either by reqwest or by the OS socket
fn is_timeout(e: &reqwest::Error) -> bool {
    e.is_timeout() || chain_timed_out(e.source())
}

fn chain_timed_out(mut source: Option<&(dyn std::error::Error + 'static)>) -> bool {
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = err.source();
    }
    false
}

fn lock(jar: &Mutex<CookieJar>) -> MutexGuard<'_, CookieJar> {
    jar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
