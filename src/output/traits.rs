//! Log event types and the sink trait
//!
//! Every fetch outcome of a crawl is reported as a [`LogEvent`] and handed to
//! a [`LogSink`], which decides whether to print or keep it.

use crate::state::VisitRecord;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Visit,
    Redirect,
    Error,
    Warning,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::Redirect => "redirect",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Data carried by a log event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Visit and redirect events carry the full record
    Visit(VisitRecord),

    /// Error and warning events carry a stable key and a human message
    Issue {
        key: String,
        message: String,
        url: Option<String>,
    },
}

/// A single entry of the crawl log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "data")]
    pub payload: EventPayload,
}

impl LogEvent {
    pub fn visit(record: VisitRecord) -> Self {
        Self::new(EventKind::Visit, EventPayload::Visit(record))
    }

    pub fn redirect(record: VisitRecord) -> Self {
        Self::new(EventKind::Redirect, EventPayload::Visit(record))
    }

    /// Error event for a crawl failure
    pub fn error(error: &CrawlError, url: Option<&str>) -> Self {
        Self::issue(EventKind::Error, error.key(), error.to_string(), url)
    }

    /// Warning event for a crawl failure that did not abandon anything
    pub fn warning(error: &CrawlError, url: Option<&str>) -> Self {
        Self::issue(EventKind::Warning, error.key(), error.to_string(), url)
    }

    pub fn issue(kind: EventKind, key: &str, message: String, url: Option<&str>) -> Self {
        Self::new(
            kind,
            EventPayload::Issue {
                key: key.to_string(),
                message,
                url: url.map(str::to_string),
            },
        )
    }

    fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Returns the record of a visit or redirect event
    pub fn record(&self) -> Option<&VisitRecord> {
        match &self.payload {
            EventPayload::Visit(record) => Some(record),
            EventPayload::Issue { .. } => None,
        }
    }

    /// Returns the key of an error or warning event
    pub fn key(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Issue { key, .. } => Some(key),
            EventPayload::Visit(_) => None,
        }
    }

    /// Returns the message of an error or warning event
    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Issue { message, .. } => Some(message),
            EventPayload::Visit(_) => None,
        }
    }
}

/// Receiver of crawl log events
///
/// Implementations must be thread-safe; one sink is shared by every worker of
/// a crawl session.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}
