//! HTML link collection
//!
//! This module extracts candidate URLs from an HTML page according to the
//! configured tag and CSS selector rules, resolving each one against the page
//! (or its `<base href>`) and dropping the ones the crawl has no use for.

use crate::config::CollectOptions;
use crate::url::{resolve_relative, ParsedUrl};
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// A URL found on a page, already resolved to absolute form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub url: String,
    pub url_info: ParsedUrl,
}

/// A compiled selector with the attributes to read from its matches
#[derive(Debug)]
struct CollectRule {
    selector: Selector,
    attributes: Vec<String>,
}

/// Extracts links from HTML pages
#[derive(Debug)]
pub struct LinkCollector {
    rules: Vec<CollectRule>,
    base_selector: Selector,
    protocols: HashSet<String>,
    exclude: HashSet<String>,
}

impl LinkCollector {
    /// Compiles the tag and CSS rules of the collect options
    pub fn new(options: &CollectOptions) -> Result<Self, ConfigError> {
        let rules = options
            .tags
            .iter()
            .chain(options.css.iter())
            .map(|(selector, attributes)| {
                Ok(CollectRule {
                    selector: compile(selector)?,
                    attributes: attributes.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            rules,
            base_selector: compile("base[href]")?,
            protocols: options.protocols.iter().map(|p| p.to_lowercase()).collect(),
            exclude: options.exclude.iter().cloned().collect(),
        })
    }

    /// Collects candidate URLs from a page
    ///
    /// Empty and fragment-only values are skipped. A value is dropped when it
    /// cannot be resolved, when its scheme is not an allowed protocol, or when
    /// its absolute form is in the static exclude list or rejected by
    /// `is_excluded`. Each URL is returned at most once, in document order.
    ///
    /// # Arguments
    ///
    /// * `html` - The page body
    /// * `page` - The URL the page was fetched from
    /// * `is_excluded` - Extra exclusion check, typically the visited set
    pub fn collect(
        &self,
        html: &str,
        page: &ParsedUrl,
        is_excluded: impl Fn(&str) -> bool,
    ) -> Vec<CandidateUrl> {
        if html.trim().is_empty() {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        let base = self.base_url(&document, page);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for rule in &self.rules {
            for element in document.select(&rule.selector) {
                for attribute in &rule.attributes {
                    let Some(value) = element.value().attr(attribute) else {
                        continue;
                    };

                    if let Some(candidate) = self.candidate(value, &base, &is_excluded) {
                        if seen.insert(candidate.url.clone()) {
                            candidates.push(candidate);
                        }
                    }
                }
            }
        }

        debug!("Collected {} links from {}", candidates.len(), page);
        candidates
    }

    /// Returns the `<base href>` of the document, or the page URL
    fn base_url(&self, document: &Html, page: &ParsedUrl) -> ParsedUrl {
        document
            .select(&self.base_selector)
            .next()
            .and_then(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .and_then(|href| resolve_relative(href, page).ok())
            .filter(ParsedUrl::is_absolute)
            .unwrap_or_else(|| page.clone())
    }

    fn candidate(
        &self,
        value: &str,
        base: &ParsedUrl,
        is_excluded: &impl Fn(&str) -> bool,
    ) -> Option<CandidateUrl> {
        let value = value.trim();
        if value.is_empty() || value.starts_with('#') {
            return None;
        }

        let url_info = match resolve_relative(value, base) {
            Ok(url_info) => url_info,
            Err(e) => {
                debug!("Dropping link {}: {}", value, e);
                return None;
            }
        };

        let scheme = url_info.scheme.as_deref().unwrap_or_default();
        if !self.protocols.contains(scheme) {
            return None;
        }

        if !url_info.is_absolute() {
            debug!("Dropping link {}: no host", value);
            return None;
        }

        let url = url_info.assemble();
        if self.exclude.contains(&url) || is_excluded(url.as_str()) {
            return None;
        }

        Some(CandidateUrl { url, url_info })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", selector, e)))
}
