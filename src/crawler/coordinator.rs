//! Crawl session - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Popping frontier items in batches of up to `workers` items
//! - The HEAD-first request pipeline with manual redirect following
//! - Link collection on crawlable HTML pages
//! - Enqueueing permitted links with their parent chain
//! - The run-wide time budget and end-of-run cookie jar persistence

use crate::config::{validate, validate_start_url, Options};
use crate::cookies::CookieJar;
use crate::crawler::fetcher::{HttpClient, HttpResponse, RequestOptions};
use crate::crawler::frontier::{Frontier, FrontierItem};
use crate::crawler::parser::LinkCollector;
use crate::output::{CrawlStats, LogEvent, LogSink};
use crate::state::{Timer, VisitRecord, VisitState};
use crate::url::{ParsedUrl, UrlFilter};
use crate::{CrawlError, VisitorError};
use futures::future::join_all;
use reqwest::Method;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Status returned by servers that refuse HEAD requests
const METHOD_NOT_ALLOWED: i32 = 405;

/// Items processed between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Result of a finished crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub stats: CrawlStats,

    /// The failure that stopped the run early, if any
    pub halted: Option<CrawlError>,
}

impl CrawlReport {
    pub fn completed(&self) -> bool {
        self.halted.is_none()
    }
}

/// What processing one frontier item produced
#[derive(Debug, Default)]
struct ItemOutcome {
    /// Every URL requested on the way to a terminal state
    touched: Vec<(String, VisitRecord)>,

    /// Permitted links found on the final page
    discovered: Vec<FrontierItem>,

    /// Set when the whole run must stop
    halt: Option<CrawlError>,

    last_url: Option<String>,
}

impl ItemOutcome {
    fn touch(&mut self, url: &str, record: VisitRecord) {
        self.last_url = Some(url.to_string());
        self.touched.push((url.to_string(), record));
    }

    fn has_touched(&self, url: &str) -> bool {
        self.touched.iter().any(|(touched, _)| touched == url)
    }
}

/// State of one crawl run
///
/// Owns the frontier, the visited set, the cookie jar and the timer. Events
/// are reported to the injected [`LogSink`].
pub struct CrawlSession {
    start: ParsedUrl,
    options: Options,
    client: HttpClient,
    collector: LinkCollector,
    filter: UrlFilter,
    frontier: Frontier,
    visited: HashMap<String, VisitRecord>,
    queued: HashSet<String>,

    /// URLs claimed by an item of the running batch
    in_flight: Mutex<HashSet<String>>,

    jar: Mutex<CookieJar>,
    timer: Timer,
    sink: Arc<dyn LogSink>,
    stats: Mutex<CrawlStats>,
    last_url: String,
}

impl CrawlSession {
    /// Creates a session and seeds its frontier with the start URL
    ///
    /// # Arguments
    ///
    /// * `start_url` - Absolute http(s) URL the crawl starts from
    /// * `options` - Crawl options; normalized and validated here
    /// * `sink` - Receiver of the crawl's log events
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - Ready to run
    /// * `Err(VisitorError)` - Invalid start URL or options, or the HTTP
    ///   client could not be built
    pub fn new(
        start_url: &str,
        mut options: Options,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, VisitorError> {
        validate_start_url(start_url)?;
        options.normalize();
        validate(&options)?;

        let start = ParsedUrl::parse(start_url)?;
        let start_host = start.host.clone().unwrap_or_default();

        let client = HttpClient::new(&options.http)?;
        let collector = LinkCollector::new(&options.collect)?;
        let filter = UrlFilter::new(&options, &start_host)?;

        let mut frontier = Frontier::new(options.frontier);
        let seed = FrontierItem::seed(start.clone());
        let mut queued = HashSet::new();
        queued.insert(seed.url.clone());
        frontier.push(seed);

        let stats = CrawlStats {
            enqueued: 1,
            ..CrawlStats::default()
        };

        Ok(Self {
            last_url: start.assemble(),
            start,
            timer: Timer::start(options.time_limit),
            options,
            client,
            collector,
            filter,
            frontier,
            visited: HashMap::new(),
            queued,
            in_flight: Mutex::new(HashSet::new()),
            jar: Mutex::new(CookieJar::new()),
            sink,
            stats: Mutex::new(stats),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Every URL touched so far, redirect hops and failures included
    pub fn visited(&self) -> &HashMap<String, VisitRecord> {
        &self.visited
    }

    /// Returns a snapshot of the cookie jar
    pub fn cookie_jar(&self) -> CookieJar {
        lock(&self.jar).clone()
    }

    pub fn stats(&self) -> CrawlStats {
        lock(&self.stats).clone()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Runs the crawl until the frontier is empty or the time limit is hit
    pub async fn run(&mut self) -> CrawlReport {
        info!(
            "Starting crawl of {} with {} worker(s)",
            self.start, self.options.workers
        );
        self.timer = Timer::start(self.options.time_limit);

        let mut halted = None;
        let mut processed: u64 = 0;
        let mut next_progress = PROGRESS_INTERVAL;

        loop {
            let batch = self.next_batch();
            if batch.is_empty() {
                info!("Frontier is empty, crawl complete");
                break;
            }
            processed += batch.len() as u64;

            let session = &*self;
            let outcomes = join_all(batch.into_iter().map(|item| session.visit_item(item))).await;
            for outcome in outcomes {
                if let Some(halt) = self.merge(outcome) {
                    halted.get_or_insert(halt);
                }
            }
            lock(&self.in_flight).clear();

            if halted.is_none() && self.timer.expired() {
                halted = Some(self.time_limit_error(self.last_url.clone()));
            }
            if halted.is_some() {
                break;
            }

            if processed >= next_progress {
                next_progress = processed + PROGRESS_INTERVAL;
                info!(
                    "Progress: {} items processed, {} in frontier, {:.1}s elapsed",
                    processed,
                    self.frontier.len(),
                    self.timer.elapsed().as_secs_f64()
                );
            }
        }

        self.write_cookiejar();

        if let Some(error) = &halted {
            warn!("Crawl halted: {}", error);
            self.emit(LogEvent::error(error, Some(&self.last_url)));
        }

        let mut stats = self.stats();
        stats.elapsed = self.timer.elapsed();
        lock(&self.stats).elapsed = stats.elapsed;
        stats.log_summary();

        CrawlReport { stats, halted }
    }

    /// Pops up to `workers` distinct items whose URLs were not visited yet
    fn next_batch(&mut self) -> Vec<FrontierItem> {
        let mut batch: Vec<FrontierItem> = Vec::new();

        while batch.len() < self.options.workers {
            let Some(item) = self.frontier.pop() else {
                break;
            };

            if self.visited.contains_key(&item.url) || batch.iter().any(|b| b.url == item.url) {
                debug!("Skipping already visited {}", item.url);
                lock(&self.stats).skipped += 1;
                continue;
            }

            batch.push(item);
        }

        batch
    }

    /// Folds an item's outcome into the session state
    fn merge(&mut self, outcome: ItemOutcome) -> Option<CrawlError> {
        if let Some(last_url) = outcome.last_url {
            self.last_url = last_url;
        }

        for (url, record) in outcome.touched {
            self.visited.insert(url, record);
        }

        let mut enqueued = 0;
        for child in outcome.discovered {
            if self.visited.contains_key(&child.url) || !self.queued.insert(child.url.clone()) {
                continue;
            }
            self.frontier.push(child);
            enqueued += 1;
        }
        lock(&self.stats).enqueued += enqueued;

        outcome.halt
    }

    /// Drives one frontier item to a terminal state
    async fn visit_item(&self, item: FrontierItem) -> ItemOutcome {
        let mut outcome = ItemOutcome::default();
        let mut current = item.url.clone();
        let mut method = Method::HEAD;
        let mut hops: u32 = 0;
        let mut claimed = false;

        loop {
            if !claimed {
                if !self.claim(&current) {
                    debug!("{} is already being fetched, dropping {}", current, item.url);
                    return outcome;
                }
                claimed = true;
            }

            let response = self
                .client
                .request(&current, &RequestOptions::single(method.clone()), self.jar())
                .await;

            if method == Method::HEAD && response.code == METHOD_NOT_ALLOWED {
                debug!("HEAD refused by {}, retrying with GET", current);
                method = Method::GET;
                continue;
            }

            let is_internal = self.is_internal(&response.url);

            if let Some(error) = &response.error {
                let record = VisitRecord::new(&response, &item.parents, is_internal, VisitState::Errored);
                outcome.touch(&current, record);
                warn!("Abandoning {}: {}", item.url, error);
                self.emit(LogEvent::error(error, Some(&current)));
                return outcome;
            }

            if let Some(target) = response.follow_target().map(str::to_string) {
                let record =
                    VisitRecord::new(&response, &item.parents, is_internal, VisitState::Redirected);
                outcome.touch(&current, record.clone());
                self.emit(LogEvent::redirect(record));
                hops += 1;

                if hops > self.options.request_max_redirects {
                    let error = CrawlError::TooManyRedirects {
                        url: item.url.clone(),
                    };
                    self.emit(LogEvent::error(&error, Some(&item.url)));
                    return outcome;
                }

                if self.timer.expired() {
                    outcome.halt = Some(self.time_limit_error(current));
                    return outcome;
                }

                if outcome.has_touched(&target) {
                    let error = CrawlError::InfiniteLoop {
                        url: item.url.clone(),
                    };
                    self.emit(LogEvent::error(&error, Some(&item.url)));
                    return outcome;
                }

                if self.visited.contains_key(&target) {
                    debug!("Redirect from {} converged on visited {}", current, target);
                    return outcome;
                }

                current = target;
                method = Method::HEAD;
                claimed = false;
                continue;
            }

            let record = VisitRecord::new(&response, &item.parents, is_internal, VisitState::Visited);
            outcome.touch(&current, record.clone());
            self.emit(LogEvent::visit(record));

            if self.should_collect(&item, &response, is_internal) {
                let discovered = self.collect_links(&item, response, &outcome).await;
                outcome.discovered = discovered;
            }

            return outcome;
        }
    }

    /// Decides whether the body of a final response is scanned for links
    fn should_collect(&self, item: &FrontierItem, response: &HttpResponse, is_internal: bool) -> bool {
        let crawlable = u16::try_from(response.code)
            .map(|code| self.options.crawlable_response_codes.contains(&code))
            .unwrap_or(false);

        item.collect
            && crawlable
            && (self.options.crawl_external || is_internal)
            && response.is_html()
    }

    /// Fetches the page body if needed and turns its links into child items
    async fn collect_links(
        &self,
        item: &FrontierItem,
        response: HttpResponse,
        outcome: &ItemOutcome,
    ) -> Vec<FrontierItem> {
        let page_url = response.url.clone();

        let body = if response.method == Method::GET {
            response.body
        } else {
            let full = self
                .client
                .request(&page_url, &RequestOptions::single(Method::GET), self.jar())
                .await;
            if let Some(error) = &full.error {
                self.emit(LogEvent::warning(error, Some(&page_url)));
                return Vec::new();
            }
            full.body
        };

        let page = match ParsedUrl::parse(&page_url) {
            Ok(page) => page,
            Err(e) => {
                debug!("Cannot collect links from {}: {}", page_url, e);
                return Vec::new();
            }
        };

        let candidates = self.collector.collect(&body, &page, |url| {
            self.visited.contains_key(url) || self.queued.contains(url) || outcome.has_touched(url)
        });

        candidates
            .into_iter()
            .filter(|candidate| self.filter.check(&candidate.url_info).allowed())
            .map(|candidate| item.child(&page_url, candidate.url_info))
            .collect()
    }

    /// Writes the cookie jar if a file was configured
    fn write_cookiejar(&self) {
        let Some(path) = &self.options.cookiejar else {
            return;
        };

        if let Err(e) = lock(&self.jar).write(path) {
            warn!("Failed to write cookie jar to {}: {}", path.display(), e);
            let error = CrawlError::CookiejarWrite {
                path: path.display().to_string(),
            };
            self.emit(LogEvent::warning(&error, None));
        } else {
            info!("Cookie jar written to {}", path.display());
        }
    }

    /// Reserves a URL for this batch; false if another item holds it
    fn claim(&self, url: &str) -> bool {
        lock(&self.in_flight).insert(url.to_string())
    }

    fn jar(&self) -> Option<&Mutex<CookieJar>> {
        if self.options.cookies_enabled {
            Some(&self.jar)
        } else {
            None
        }
    }

    fn is_internal(&self, url: &str) -> bool {
        ParsedUrl::parse(url)
            .ok()
            .and_then(|parsed| parsed.host)
            .map(|host| self.filter.is_internal(&host))
            .unwrap_or(false)
    }

    fn time_limit_error(&self, last_url: String) -> CrawlError {
        CrawlError::TimeLimitReached {
            time_limit: self.options.time_limit,
            last_url,
        }
    }

    fn emit(&self, event: LogEvent) {
        lock(&self.stats).record(&event);
        self.sink.emit(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
