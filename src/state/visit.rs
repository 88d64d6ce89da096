//! Visit records for URLs touched during a crawl

use crate::crawler::HttpResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a touched URL ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitState {
    /// A final response was received
    Visited,

    /// The URL answered with a redirect that was followed
    Redirected,

    /// The exchange failed or the redirect chain was abandoned
    Errored,
}

impl VisitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visited => "visited",
            Self::Redirected => "redirected",
            Self::Errored => "errored",
        }
    }

    /// Returns true if the record carries a usable final response
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Visited)
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response merged with its place in the crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Absolute URL that was fetched
    pub url: String,

    /// Status code, or a negative sentinel when no HTTP status exists
    pub code: i32,

    pub content_type: Option<String>,

    /// Lowercased header names mapped to every value received
    pub headers: BTreeMap<String, Vec<String>>,

    /// Crawl path from the start URL, oldest first
    pub parents: Vec<String>,

    /// Direct parent, the last entry of `parents`
    pub parent: Option<String>,

    pub is_internal: bool,

    /// Where a redirect pointed to
    pub redirect_url: Option<String>,

    pub state: VisitState,

    /// Error key when the exchange failed
    pub error: Option<String>,
}

impl VisitRecord {
    /// Builds a record from a response
    pub fn new(
        response: &HttpResponse,
        parents: &[String],
        is_internal: bool,
        state: VisitState,
    ) -> Self {
        Self {
            url: response.url.clone(),
            code: response.code,
            content_type: response.content_type.clone(),
            headers: response.headers.clone(),
            parents: parents.to_vec(),
            parent: parents.last().cloned(),
            is_internal,
            redirect_url: response.redirect_url.clone(),
            state,
            error: response.error.as_ref().map(|e| e.key().to_string()),
        }
    }
}
