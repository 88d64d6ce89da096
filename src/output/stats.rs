//! Run statistics
//!
//! Counters accumulated while a crawl session runs, logged when it ends.

use super::traits::{EventKind, LogEvent};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Final responses received
    pub visits: u64,

    /// Redirect hops followed
    pub redirects: u64,

    pub errors: u64,

    pub warnings: u64,

    /// Links pushed onto the frontier, the seed included
    pub enqueued: u64,

    /// Frontier items dropped because their URL was already visited
    pub skipped: u64,

    pub elapsed: Duration,
}

impl CrawlStats {
    /// Counts an emitted event
    pub fn record(&mut self, event: &LogEvent) {
        match event.kind {
            EventKind::Visit => self.visits += 1,
            EventKind::Redirect => self.redirects += 1,
            EventKind::Error => self.errors += 1,
            EventKind::Warning => self.warnings += 1,
        }
    }

    /// Logs the statistics at info level
    pub fn log_summary(&self) {
        info!(
            visits = self.visits,
            redirects = self.redirects,
            errors = self.errors,
            warnings = self.warnings,
            enqueued = self.enqueued,
            skipped = self.skipped,
            "Crawl finished in {:.1}s",
            self.elapsed.as_secs_f64()
        );
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Crawl Statistics ===")?;
        writeln!(f, "  Visits: {}", self.visits)?;
        writeln!(f, "  Redirects: {}", self.redirects)?;
        writeln!(f, "  Errors: {}", self.errors)?;
        writeln!(f, "  Warnings: {}", self.warnings)?;
        writeln!(f, "  Links enqueued: {}", self.enqueued)?;
        writeln!(f, "  Skipped (already visited): {}", self.skipped)?;
        write!(f, "  Elapsed: {:.1}s", self.elapsed.as_secs_f64())
    }
}
