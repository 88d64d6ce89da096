use crate::url::ParsedUrl;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Netscape-style date format still sent by many servers
const NETSCAPE_DATE_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// RFC 850 date format with a two-digit year
const RFC850_DATE_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";

/// A cookie received in a `Set-Cookie` header
///
/// `domain` is always stored with a leading dot. Cookies set without a
/// `Domain` attribute are host-only: their domain is the setting host and they
/// never match its subdomains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub expires: Option<String>,
    pub expires_time: Option<i64>,
    pub secure: bool,
    pub httponly: bool,
    pub session: bool,
    pub raw: String,
    pub source: String,
}

impl Cookie {
    /// Parses a `Set-Cookie` header value received from `source`
    ///
    /// Returns `None` when the header carries no cookie name.
    ///
    /// # Examples
    ///
    /// ```
    /// use visitor::cookies::Cookie;
    /// use visitor::url::ParsedUrl;
    ///
    /// let source = ParsedUrl::parse("http://shop.example.com/cart").unwrap();
    /// let cookie = Cookie::parse("sid=a%20b; Path=/cart; Secure", &source).unwrap();
    /// assert_eq!(cookie.value, "a b");
    /// assert_eq!(cookie.domain, ".shop.example.com");
    /// assert!(cookie.host_only);
    /// assert!(cookie.secure);
    /// ```
    pub fn parse(raw: &str, source: &ParsedUrl) -> Option<Self> {
        let mut parts = raw.split("; ");
        let pair = parts.next()?.trim();
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(name.trim());
        if name.is_empty() {
            return None;
        }

        let source_host = source.host.as_deref().unwrap_or_default().to_lowercase();
        let mut cookie = Cookie {
            name,
            value: decode(value.trim()),
            domain: format!(".{}", source_host),
            host_only: true,
            path: "/".to_string(),
            expires: None,
            expires_time: None,
            secure: false,
            httponly: false,
            session: true,
            raw: raw.to_string(),
            source: source.assemble(),
        };

        for attribute in parts {
            let (key, value) = match attribute.split_once('=') {
                Some((key, value)) => (key.trim().to_lowercase(), value.trim()),
                None => (attribute.trim().to_lowercase(), ""),
            };

            match key.as_str() {
                "domain" if !value.is_empty() => {
                    let domain = value.trim_start_matches('.').to_lowercase();
                    cookie.domain = format!(".{}", domain);
                    cookie.host_only = false;
                }
                "path" if !value.is_empty() => cookie.path = value.to_string(),
                "expires" => {
                    cookie.expires = Some(value.to_string());
                    cookie.expires_time = parse_expires(value);
                    cookie.session = false;
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.httponly = true,
                _ => {}
            }
        }

        Some(cookie)
    }

    /// Returns true if the cookie has expired at `now` (epoch seconds)
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_time, Some(expires) if expires < now)
    }

    /// Returns true if the cookie may be sent to `host`
    pub fn matches_domain(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let exact = self.domain.strip_prefix('.') == Some(host.as_str());
        if self.host_only {
            exact
        } else {
            exact || host.ends_with(&self.domain)
        }
    }

    /// Returns true if the cookie may be sent for `request_path`
    pub fn matches_path(&self, request_path: &str) -> bool {
        let request_path = if request_path.is_empty() { "/" } else { request_path };
        request_path.starts_with(self.path.trim_end_matches('/'))
    }
}

/// Serializes cookies for a `Cookie` request header
pub fn serialize_for_wire<'a>(cookies: impl IntoIterator<Item = &'a Cookie>) -> String {
    cookies
        .into_iter()
        .map(|cookie| {
            format!(
                "{}={}",
                urlencoding::encode(&cookie.name),
                urlencoding::encode(&cookie.value)
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Converts an `Expires` attribute into epoch seconds
fn parse_expires(value: &str) -> Option<i64> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.timestamp());
    }

    [NETSCAPE_DATE_FORMAT, RFC850_DATE_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
}
