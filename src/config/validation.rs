use crate::config::types::{CollectOptions, ExcludeRule, HttpOptions, Options, Project};
use crate::url::ParsedUrl;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// Upper bound on concurrently fetched frontier items
pub const MAX_WORKERS: usize = 100;

/// Validates a project: its start URL and its options
pub fn validate_project(project: &Project) -> Result<(), ConfigError> {
    validate_start_url(&project.start_url)?;
    validate(&project.options)
}

/// Validates the crawl options
pub fn validate(options: &Options) -> Result<(), ConfigError> {
    if options.workers < 1 || options.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, options.workers
        )));
    }

    for code in &options.crawlable_response_codes {
        validate_status_code(*code)?;
    }

    if options.format.trim().is_empty() {
        return Err(ConfigError::Validation("format cannot be empty".to_string()));
    }

    for host in &options.internal {
        validate_domain_pattern(host)?;
    }

    validate_exclude_rules(&options.exclude)?;
    validate_http_options(&options.http)?;
    validate_collect_options(&options.collect)?;

    Ok(())
}

/// Validates that a start URL is an absolute http(s) URL
pub fn validate_start_url(url: &str) -> Result<(), ConfigError> {
    let parsed = ParsedUrl::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", url, e)))?;

    if !parsed.is_absolute() {
        return Err(ConfigError::InvalidUrl(format!(
            "Start URL '{}' must be absolute",
            url
        )));
    }

    match parsed.scheme.as_deref() {
        Some("http") | Some("https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl(format!(
            "Start URL '{}' must use the http or https scheme",
            url
        ))),
    }
}

fn validate_status_code(code: u16) -> Result<(), ConfigError> {
    if !(100..=599).contains(&code) {
        return Err(ConfigError::Validation(format!(
            "crawlable_response_codes must be HTTP status codes, got {}",
            code
        )));
    }
    Ok(())
}

fn validate_http_options(http: &HttpOptions) -> Result<(), ConfigError> {
    if http.connection_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "connection_timeout must be >= 1 second, got {}",
            http.connection_timeout
        )));
    }

    if http.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some((user, _)) = http.credentials() {
        if user.is_empty() {
            return Err(ConfigError::Validation(
                "auth must be given as user:pass".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_collect_options(collect: &CollectOptions) -> Result<(), ConfigError> {
    if collect.protocols.is_empty() {
        return Err(ConfigError::Validation(
            "collect.protocols cannot be empty".to_string(),
        ));
    }

    for selector in collect.tags.keys().chain(collect.css.keys()) {
        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", selector, e)))?;
    }

    Ok(())
}

fn validate_exclude_rules(rules: &[ExcludeRule]) -> Result<(), ConfigError> {
    for rule in rules {
        match rule {
            ExcludeRule::Regex { regex } => {
                Regex::new(regex)
                    .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", regex, e)))?;
            }
            ExcludeRule::Domain { domain } => validate_domain_pattern(domain)?,
        }
    }
    Ok(())
}

/// Validates a host pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' cannot be empty",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
