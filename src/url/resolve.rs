use super::ParsedUrl;
use crate::{UrlError, UrlResult};

/// Resolves a relative path against a base path
///
/// The base is treated as a directory only when it ends in `/`; otherwise its
/// last segment names a file and is dropped before resolving. `.` segments are
/// skipped, `..` segments pop one directory, and repeated slashes collapse.
/// A leading `/` on the base is preserved, as is a trailing `/` on the
/// relative path.
///
/// # Arguments
///
/// * `base` - The path of the page the reference was found on
/// * `rel` - The relative path to resolve
///
/// # Returns
///
/// * `Ok(String)` - The resolved path
/// * `Err(UrlError::PathEscapesRoot)` - `rel` climbs above the base's root
///
/// # Examples
///
/// ```
/// use visitor::url::resolve_path;
///
/// assert_eq!(resolve_path("/en/", "image.jpg").unwrap(), "/en/image.jpg");
/// assert_eq!(resolve_path("/en", "image.jpg").unwrap(), "/image.jpg");
/// assert_eq!(resolve_path("/a/b/c/", "../../test.html").unwrap(), "/a/test.html");
/// assert!(resolve_path("/", "../test.html").is_err());
/// ```
pub fn resolve_path(base: &str, rel: &str) -> UrlResult<String> {
    if base.is_empty() {
        return Ok(rel.to_string());
    }

    let prefix = if base.starts_with('/') { "/" } else { "" };

    let directory = if base.ends_with('/') {
        base
    } else {
        match base.rfind('/') {
            Some(idx) => &base[..idx],
            None => "",
        }
    };

    let mut segments: Vec<&str> = directory.split('/').filter(|s| !s.is_empty()).collect();
    let rel_segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();

    let ups = rel_segments.iter().filter(|s| **s == "..").count();
    if ups > segments.len() {
        return Err(UrlError::PathEscapesRoot {
            base: base.to_string(),
            rel: rel.to_string(),
        });
    }

    for segment in &rel_segments {
        match *segment {
            "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut resolved = format!("{}{}", prefix, segments.join("/"));

    let rel_names_directory = rel.ends_with('/')
        || matches!(rel_segments.last(), Some(&".") | Some(&".."));
    if rel_names_directory && !segments.is_empty() {
        resolved.push('/');
    }

    Ok(resolved)
}

/// Returns the directory part of a base URL's path, always ending in `/`
pub fn base_directory(base: &ParsedUrl) -> String {
    let path = base.path_or_root();
    if path.ends_with('/') {
        return path.to_string();
    }

    let directory = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    format!("{}/", directory.trim_end_matches('/'))
}

/// Resolves a URL reference found on a page into an absolute URL
///
/// Network-path (`//host/...`), root-relative (`/...`) and query-only
/// (`?...`) references are rewritten onto the base first. References that
/// already carry a scheme are returned unchanged. Everything else inherits the
/// base's scheme, host and port and has its path resolved against the base
/// directory with [`resolve_path`].
///
/// # Examples
///
/// ```
/// use visitor::url::{resolve_relative, ParsedUrl};
///
/// let base = ParsedUrl::parse("http://example.com/a/b/c/folder/").unwrap();
/// let resolved = resolve_relative("image.jpg", &base).unwrap();
/// assert_eq!(resolved.assemble(), "http://example.com/a/b/c/folder/image.jpg");
///
/// let base = ParsedUrl::parse("http://example.com/a/b/c/folder").unwrap();
/// let resolved = resolve_relative("image.jpg", &base).unwrap();
/// assert_eq!(resolved.assemble(), "http://example.com/a/b/c/image.jpg");
/// ```
pub fn resolve_relative(url: &str, base: &ParsedUrl) -> UrlResult<ParsedUrl> {
    let url = url.trim();

    let rewritten = if url.starts_with("//") {
        format!("{}:{}", base.scheme.as_deref().unwrap_or("http"), url)
    } else if url.starts_with('/') {
        format!("{}{}", base.root(), url)
    } else if url.starts_with('?') {
        format!("{}{}{}", base.root(), base.path_or_root(), url)
    } else {
        url.to_string()
    };

    let parsed = ParsedUrl::parse(&rewritten)?;
    if parsed.scheme.is_some() {
        return Ok(parsed);
    }

    if !base.is_absolute() {
        return Err(UrlError::InvalidRelativePath(format!(
            "cannot resolve \"{}\" against non-absolute base \"{}\"",
            url, base
        )));
    }

    let path = resolve_path(&base_directory(base), parsed.path.as_deref().unwrap_or(""))?;

    let resolved = ParsedUrl {
        scheme: base.scheme.clone(),
        host: base.host.clone(),
        port: base.port,
        path: Some(path),
        query: parsed.query,
    };

    // Re-parse so relative results share the canonical form of absolute ones
    ParsedUrl::parse(&resolved.assemble())
}
