//! Output module for crawl events
//!
//! This module handles:
//! - The log event types and the `LogSink` trait sessions report through
//! - Printing and buffering sinks
//! - The format-string mini-language used to print visits
//! - Run statistics

mod format;
mod sinks;
pub mod stats;
mod traits;

pub use format::{format_string, format_visit, visit_to_value, FormatValue, PARENTS_SEPARATOR};
pub use sinks::{MemorySink, PrintSink};
pub use stats::CrawlStats;
pub use traits::{EventKind, EventPayload, LogEvent, LogSink};
