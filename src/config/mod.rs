//! Configuration module for Visitor
//!
//! This module defines the crawl options and handles loading, parsing, and
//! validating project files (JSON or TOML).
//!
//! # Example
//!
//! ```no_run
//! use visitor::config::load_project;
//! use std::path::Path;
//!
//! let project = load_project(Path::new("visitor.json")).unwrap();
//! println!("Time limit: {}s", project.options.time_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CollectOptions, ExcludeRule, FrontierOrder, HttpOptions, Options, Project, DEFAULT_FORMAT,
    DEFAULT_USER_AGENT,
};

// Re-export parser and validation functions
pub use parser::{
    compute_project_hash, load_project, load_project_with_hash, parse_project, ProjectFormat,
};
pub use validation::{validate, validate_project, validate_start_url, MAX_WORKERS};
