//! Cookie handling for Visitor
//!
//! Parses `Set-Cookie` headers and keeps a jar of cookies that is matched
//! against every outgoing request of a crawl.

mod cookie;
mod jar;

pub use cookie::{serialize_for_wire, Cookie};
pub use jar::CookieJar;
