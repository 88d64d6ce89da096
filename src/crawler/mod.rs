//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP exchanges with manual redirect following and cookie handling
//! - HTML parsing and link extraction
//! - The URL frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{CrawlReport, CrawlSession};
pub use fetcher::{
    HttpClient, HttpResponse, RequestOptions, CODE_CONNECTION_FAILED, CODE_CONNECTION_TIMEDOUT,
    REDIRECT_CODES,
};
pub use frontier::{Frontier, FrontierItem};
pub use parser::{CandidateUrl, LinkCollector};

use crate::config::Options;
use crate::output::LogSink;
use crate::VisitorError;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the start URL and options
/// 2. Build the HTTP client and link collector
/// 3. Visit the start URL and every permitted link found from it
/// 4. Write the cookie jar if one is configured
///
/// # Arguments
///
/// * `start_url` - Absolute URL the crawl starts from
/// * `options` - The crawl options
/// * `sink` - Receiver of the crawl's log events
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished, possibly halted by the time limit
/// * `Err(VisitorError)` - The crawl could not be started
pub async fn crawl(
    start_url: &str,
    options: Options,
    sink: Arc<dyn LogSink>,
) -> Result<CrawlReport, VisitorError> {
    let mut session = CrawlSession::new(start_url, options, sink)?;
    Ok(session.run().await)
}
