//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `VisitRecord`: What happened to each URL touched during the crawl
//! - `VisitState`: Whether a touched URL was visited, redirected or errored
//! - `Timer`: The run-wide time budget

mod timer;
mod visit;

// Re-export main types
pub use timer::Timer;
pub use visit::{VisitRecord, VisitState};
