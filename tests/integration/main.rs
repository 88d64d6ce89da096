//! Integration tests for Visitor
//!
//! These tests run the HTTP client and full crawl sessions against wiremock
//! servers.

mod crawl_tests;
mod http_tests;
