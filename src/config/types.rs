use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows; U; Windows NT 5.1; en-US; rv:1.8.1.13) Gecko/20080311 Firefox/2.0.0.13";

/// Output template used when none is configured
pub const DEFAULT_FORMAT: &str = "code:%code url:%url parent:%parent";

/// A crawl project: a start URL plus the options to crawl it with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Human-readable project name
    #[serde(default)]
    pub name: Option<String>,

    /// URL the crawl starts from
    pub start_url: String,

    #[serde(default)]
    pub options: Options,
}

/// Crawl options
///
/// Every field has a default, so option files only need to name what they
/// change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Extra hosts treated as part of the crawled site (`*.example.com` allowed)
    pub internal: Vec<String>,

    /// Whether external URLs may be visited at all
    pub allow_external: bool,

    /// Whether links are collected from external pages
    pub crawl_external: bool,

    /// Rules that exclude URLs from the crawl
    pub exclude: Vec<ExcludeRule>,

    /// Run-wide time budget in seconds; 0 disables it
    pub time_limit: u64,

    /// Maximum redirect hops followed for a single frontier item
    pub request_max_redirects: u32,

    /// Status codes whose HTML bodies are scanned for links
    pub crawlable_response_codes: Vec<u16>,

    pub http: HttpOptions,

    pub collect: CollectOptions,

    pub cookies_enabled: bool,

    /// File the cookie jar is written to at the end of the run
    pub cookiejar: Option<PathBuf>,

    /// Template used to print visit and redirect events
    pub format: String,

    /// Print events as they happen instead of buffering them
    pub print: bool,

    pub frontier: FrontierOrder,

    /// Number of frontier items fetched concurrently
    pub workers: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            internal: Vec::new(),
            allow_external: true,
            crawl_external: false,
            exclude: Vec::new(),
            time_limit: 1800,
            request_max_redirects: 10,
            crawlable_response_codes: vec![200, 404],
            http: HttpOptions::default(),
            collect: CollectOptions::default(),
            cookies_enabled: true,
            cookiejar: None,
            format: DEFAULT_FORMAT.to_string(),
            print: true,
            frontier: FrontierOrder::default(),
            workers: 1,
        }
    }
}

impl Options {
    /// Resolves option combinations that cancel each other out
    pub fn normalize(&mut self) {
        if !self.cookies_enabled {
            self.cookiejar = None;
        }
    }
}

/// HTTP client options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    pub user_agent: String,

    /// Connection timeout in seconds
    pub connection_timeout: u64,

    /// Hop bound used when the client follows redirects itself
    pub max_redirects: u32,

    /// Basic auth credentials as `user:pass`
    pub auth: Option<String>,

    pub accept_invalid_certs: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connection_timeout: 10,
            max_redirects: 15,
            auth: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpOptions {
    /// Splits `auth` into a username and an optional password
    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        let auth = self.auth.as_deref()?;
        match auth.split_once(':') {
            Some((user, pass)) => Some((user, Some(pass))),
            None => Some((auth, None)),
        }
    }
}

/// Link collection rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectOptions {
    /// Tag name to attribute names; `*` matches every element
    pub tags: BTreeMap<String, Vec<String>>,

    /// CSS selector to attribute names
    pub css: BTreeMap<String, Vec<String>>,

    /// Schemes a collected URL may have
    pub protocols: Vec<String>,

    /// Absolute URLs that are never collected
    pub exclude: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("*".to_string(), vec!["src".to_string(), "href".to_string()]);

        Self {
            tags,
            css: BTreeMap::new(),
            protocols: vec!["http".to_string(), "https".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// A rule excluding URLs from the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExcludeRule {
    /// Excludes internal URLs matching a regular expression
    Regex { regex: String },

    /// Excludes every URL on a host (`*.example.com` allowed)
    Domain { domain: String },
}

/// Order in which the frontier hands out items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontierOrder {
    /// Breadth-first
    #[default]
    Fifo,

    /// Depth-first
    Lifo,
}
