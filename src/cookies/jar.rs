use super::cookie::{serialize_for_wire, Cookie};
use crate::url::ParsedUrl;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Cookie store for one crawl run
///
/// Cookies are keyed by a hash of their name, domain and path, so a cookie
/// re-sent with the same identity overwrites the stored one.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the identity key of a cookie
    ///
    /// A host-only cookie and a `Domain` cookie for the same host store the
    /// same dotted domain but are kept apart.
    pub fn key(cookie: &Cookie) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "name:{}|domain:{}|path:{}|host_only:{}",
            cookie.name, cookie.domain, cookie.path, cookie.host_only
        ));
        hex::encode(hasher.finalize())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Cookie> {
        self.cookies.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// Returns the cookies to send with a request, keyed by cookie name
    ///
    /// Expired cookies are never returned, and secure cookies are only
    /// returned for `https`. When two cookies share a name the one with the
    /// more specific path wins.
    pub fn matching_cookies(
        &self,
        domain: &str,
        path: &str,
        scheme: &str,
        now: i64,
    ) -> BTreeMap<String, &Cookie> {
        let mut matched: BTreeMap<String, &Cookie> = BTreeMap::new();

        for cookie in self.cookies.values() {
            if cookie.is_expired(now)
                || (cookie.secure && !scheme.eq_ignore_ascii_case("https"))
                || !cookie.matches_domain(domain)
                || !cookie.matches_path(path)
            {
                continue;
            }

            let more_specific = matched
                .get(&cookie.name)
                .map_or(true, |existing| cookie.path.len() > existing.path.len());
            if more_specific {
                matched.insert(cookie.name.clone(), cookie);
            }
        }

        matched
    }

    /// Builds the `Cookie` header value for a request, if any cookie matches
    pub fn header_for(&self, url: &ParsedUrl, now: i64) -> Option<String> {
        let matched = self.matching_cookies(
            url.host.as_deref().unwrap_or_default(),
            url.path_or_root(),
            url.scheme.as_deref().unwrap_or_default(),
            now,
        );

        if matched.is_empty() {
            None
        } else {
            Some(serialize_for_wire(matched.values().copied()))
        }
    }

    /// Stores cookies received in a response
    ///
    /// A cookie that has already expired removes any stored cookie with the
    /// same identity and is not stored itself.
    pub fn import_response_cookies(&mut self, cookies: impl IntoIterator<Item = Cookie>, now: i64) {
        for cookie in cookies {
            let key = Self::key(&cookie);
            if cookie.is_expired(now) {
                if self.cookies.remove(&key).is_some() {
                    debug!("Removed expired cookie {} for {}", cookie.name, cookie.domain);
                }
                continue;
            }

            debug!("Stored cookie {} for {}{}", cookie.name, cookie.domain, cookie.path);
            self.cookies.insert(key, cookie);
        }
    }

    /// Serializes the jar as a pretty-printed JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.cookies.values().collect::<Vec<_>>())
    }

    /// Writes the jar to a JSON file
    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
