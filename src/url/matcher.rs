use super::ParsedUrl;
use crate::config::{ExcludeRule, Options};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use tracing::debug;

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare domain and any
///    subdomain at any depth
///
/// Both sides are expected to be lowercased already.
///
/// # Examples
///
/// ```
/// use visitor::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Why a candidate URL was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The host is external and `allow_external` is off
    ExternalNotAllowed,

    /// An exclude rule matched; carries the rule's description
    ExcludedByRule(String),
}

impl Rejection {
    pub fn key(&self) -> &'static str {
        match self {
            Self::ExternalNotAllowed => "external_not_allowed",
            Self::ExcludedByRule(_) => "excluded_by_rule",
        }
    }
}

/// Outcome of a visit permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitCheck {
    pub is_internal: bool,
    pub rejection: Option<Rejection>,
}

impl VisitCheck {
    pub fn allowed(&self) -> bool {
        self.rejection.is_none()
    }
}

#[derive(Debug)]
enum CompiledRule {
    Regex(Regex),
    Domain(String),
}

impl CompiledRule {
    fn describe(&self) -> String {
        match self {
            Self::Regex(re) => format!("regex:{}", re.as_str()),
            Self::Domain(domain) => format!("domain:{}", domain),
        }
    }
}

/// Decides which discovered URLs the crawler may visit
///
/// A host is internal when it matches the start host or one of the configured
/// internal patterns. External hosts are refused unless `allow_external` is
/// set. Regex exclude rules apply to internal URLs only, domain rules to any.
#[derive(Debug)]
pub struct UrlFilter {
    internal: Vec<String>,
    allow_external: bool,
    rules: Vec<CompiledRule>,
}

impl UrlFilter {
    /// Builds a filter from the crawl options and the start URL's host
    pub fn new(options: &Options, start_host: &str) -> ConfigResult<Self> {
        let mut internal: Vec<String> = options
            .internal
            .iter()
            .map(|host| host.trim().to_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        let start_host = start_host.to_lowercase();
        if !internal.contains(&start_host) {
            internal.push(start_host);
        }

        let rules = options
            .exclude
            .iter()
            .map(|rule| match rule {
                ExcludeRule::Regex { regex } => Regex::new(regex)
                    .map(CompiledRule::Regex)
                    .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", regex, e))),
                ExcludeRule::Domain { domain } => Ok(CompiledRule::Domain(domain.to_lowercase())),
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            internal,
            allow_external: options.allow_external,
            rules,
        })
    }

    /// Returns true if the host belongs to the crawled site
    pub fn is_internal(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.internal.iter().any(|pattern| matches_wildcard(pattern, &host))
    }

    /// Checks whether a URL may be visited
    pub fn check(&self, url: &ParsedUrl) -> VisitCheck {
        let host = url.host.as_deref().unwrap_or_default();
        let is_internal = self.is_internal(host);

        let rejection = if !is_internal && !self.allow_external {
            Some(Rejection::ExternalNotAllowed)
        } else {
            self.matching_rule(url, host, is_internal)
                .map(|rule| Rejection::ExcludedByRule(rule.describe()))
        };

        if let Some(rejection) = &rejection {
            debug!("Refusing {} ({})", url, rejection.key());
        }

        VisitCheck {
            is_internal,
            rejection,
        }
    }

    fn matching_rule(&self, url: &ParsedUrl, host: &str, is_internal: bool) -> Option<&CompiledRule> {
        let assembled = url.assemble();
        let host = host.to_lowercase();
        self.rules.iter().find(|rule| match rule {
            CompiledRule::Regex(re) => is_internal && re.is_match(&assembled),
            CompiledRule::Domain(domain) => matches_wildcard(domain, &host),
        })
    }
}
