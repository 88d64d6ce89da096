//! Visitor: a single-host web crawler
//!
//! This crate fetches a start page, collects the links and resources it
//! references, and recursively visits them within configurable boundaries,
//! keeping a cookie jar across the run and reporting every fetch as a log event.

pub mod config;
pub mod cookies;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Visitor operations
#[derive(Debug, Error)]
pub enum VisitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read project file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid css selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Invalid relative path: {0}")]
    InvalidRelativePath(String),

    #[error("Relative path \"{rel}\" escapes the root of \"{base}\"")]
    PathEscapesRoot { base: String, rel: String },
}

/// Recoverable crawl failures, surfaced to the event log
///
/// Every variant maps to a stable machine-readable key (see [`CrawlError::key`])
/// and renders a human message through `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("Time limit of {time_limit} seconds was reached. Last visited page was: \"{last_url}\"")]
    TimeLimitReached { time_limit: u64, last_url: String },

    #[error("Too many redirects while visiting \"{url}\"")]
    TooManyRedirects { url: String },

    #[error("Redirect loop detected while visiting \"{url}\"")]
    InfiniteLoop { url: String },

    #[error("Connection timed out while visiting \"{url}\"")]
    ConnectionTimedOut { url: String },

    #[error("Connection to \"{url}\" failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Malformed URL: \"{url}\"")]
    MalformedUrl { url: String },

    #[error("Unable to write cookiejar to \"{path}\"")]
    CookiejarWrite { path: String },
}

impl CrawlError {
    /// Returns the stable key identifying this kind of failure
    pub fn key(&self) -> &'static str {
        match self {
            Self::TimeLimitReached { .. } => "time_limit_reached",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::InfiniteLoop { .. } => "infinite_loop",
            Self::ConnectionTimedOut { .. } => "connection_timedout",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::MalformedUrl { .. } => "malformed_url",
            Self::CookiejarWrite { .. } => "cookiejar_write_error",
        }
    }

    /// Returns true if this failure ends the whole run rather than one item
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TimeLimitReached { .. })
    }
}

/// Result type alias for Visitor operations
pub type Result<T> = std::result::Result<T, VisitorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Options, Project};
pub use crawler::{CrawlReport, CrawlSession};
pub use output::{LogEvent, LogSink, MemorySink, PrintSink};
pub use url::{resolve_path, resolve_relative, ParsedUrl};
