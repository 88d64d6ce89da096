//! URL handling module for Visitor
//!
//! This module provides permissive URL parsing into a [`ParsedUrl`],
//! relative reference resolution, and host matching for visit permissions.

mod matcher;
mod resolve;

use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export main functions
pub use matcher::{matches_wildcard, Rejection, UrlFilter, VisitCheck};
pub use resolve::{base_directory, resolve_path, resolve_relative};

/// A URL split into its components
///
/// Absolute URLs are parsed with the `url` crate, so their scheme and host are
/// lowercased, default ports are dropped, and paths are percent-encoded.
/// Relative references keep their components verbatim. Fragments are always
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedUrl {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub query: Option<String>,
}

impl ParsedUrl {
    /// Parses an absolute URL or a relative reference
    ///
    /// # Examples
    ///
    /// ```
    /// use visitor::url::ParsedUrl;
    ///
    /// let parsed = ParsedUrl::parse("HTTP://Example.com:80/a/b?x=1#top").unwrap();
    /// assert_eq!(parsed.host.as_deref(), Some("example.com"));
    /// assert_eq!(parsed.port, None);
    /// assert_eq!(parsed.assemble(), "http://example.com/a/b?x=1");
    ///
    /// let relative = ParsedUrl::parse("../img/logo.png").unwrap();
    /// assert!(!relative.is_absolute());
    /// ```
    pub fn parse(input: &str) -> UrlResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Malformed("empty URL".to_string()));
        }

        let without_fragment = match trimmed.split_once('#') {
            Some((head, _)) => head,
            None => trimmed,
        };

        match split_scheme(without_fragment) {
            Some((_, rest)) if rest.starts_with("//") => Self::parse_absolute(without_fragment),
            Some((scheme, rest)) => {
                // Opaque URLs such as mailto: or javascript:
                let (path, query) = split_query(rest);
                Ok(Self {
                    scheme: Some(scheme.to_ascii_lowercase()),
                    path: non_empty(path),
                    query: query.map(str::to_string),
                    ..Self::default()
                })
            }
            None if without_fragment.starts_with("//") => {
                Self::parse_network_path(&without_fragment[2..], without_fragment)
            }
            None => {
                let (path, query) = split_query(without_fragment);
                Ok(Self {
                    path: non_empty(path),
                    query: query.map(str::to_string),
                    ..Self::default()
                })
            }
        }
    }

    fn parse_absolute(input: &str) -> UrlResult<Self> {
        let url = ::url::Url::parse(input)
            .map_err(|e| UrlError::Malformed(format!("{}: {}", input, e)))?;

        Ok(Self {
            scheme: Some(url.scheme().to_string()),
            host: url.host_str().map(str::to_string),
            port: url.port(),
            path: non_empty(url.path()),
            query: url.query().map(str::to_string),
        })
    }

    /// Parses `host[:port][/path][?query]` with the leading `//` stripped
    fn parse_network_path(rest: &str, original: &str) -> UrlResult<Self> {
        let authority_end = rest.find(|c| c == '/' || c == '?').unwrap_or(rest.len());
        let (authority, remainder) = rest.split_at(authority_end);

        // A colon inside an IPv6 literal is not a port separator
        let port_sep = authority
            .rfind(':')
            .filter(|&colon| authority.rfind(']').map_or(true, |bracket| colon > bracket));

        let (host, port) = match port_sep.map(|colon| (&authority[..colon], &authority[colon + 1..])) {
            Some((host, port)) if !port.is_empty() => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| UrlError::Malformed(format!("invalid port in {}", original)))?;
                (host, Some(port))
            }
            Some((host, _)) => (host, None),
            None => (authority, None),
        };

        if host.is_empty() {
            return Err(UrlError::Malformed(format!("missing host in {}", original)));
        }

        let (path, query) = split_query(remainder);
        Ok(Self {
            scheme: None,
            host: Some(host.to_ascii_lowercase()),
            port,
            path: non_empty(path),
            query: query.map(str::to_string),
        })
    }

    /// Returns true if both a scheme and a host are present
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some() && self.host.is_some()
    }

    /// Returns the path, or `/` when the URL has none
    pub fn path_or_root(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }

    /// Returns `scheme://host[:port]`
    pub fn root(&self) -> String {
        let mut root = format!(
            "{}://{}",
            self.scheme.as_deref().unwrap_or_default(),
            self.host.as_deref().unwrap_or_default()
        );
        if let Some(port) = self.port {
            root.push_str(&format!(":{}", port));
        }
        root
    }

    /// Reassembles the components into a URL string
    ///
    /// For absolute URLs the result is normalized enough to serve as a
    /// deduplication key: exactly one `/` separates host and path, and `&amp;`
    /// entities left over from HTML attributes are unescaped in the query.
    pub fn assemble(&self) -> String {
        let is_slash = |c: char| c == '/' || c == '\\';

        let mut assembled = match &self.host {
            Some(host) => {
                let mut root = format!(
                    "{}://{}",
                    self.scheme.as_deref().unwrap_or_default(),
                    host.trim_end_matches(is_slash)
                );
                if let Some(port) = self.port {
                    root.push_str(&format!(":{}", port));
                }
                if let Some(path) = &self.path {
                    root.push('/');
                    root.push_str(path.trim_start_matches(is_slash));
                }
                root
            }
            None => {
                let mut opaque = String::new();
                if let Some(scheme) = &self.scheme {
                    opaque.push_str(scheme);
                    opaque.push(':');
                }
                if let Some(path) = &self.path {
                    opaque.push_str(path);
                }
                opaque
            }
        };

        if let Some(query) = &self.query {
            assembled.push('?');
            assembled.push_str(&query.replace("&amp;", "&"));
        }

        assembled
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.assemble())
    }
}

/// Splits `scheme:rest` when the prefix is a syntactically valid scheme
fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = input.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some((scheme, rest))
    } else {
        None
    }
}

fn split_query(input: &str) -> (&str, Option<&str>) {
    match input.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (input, None),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
