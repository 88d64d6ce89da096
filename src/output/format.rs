//! Format-string mini-language for visit output
//!
//! A template such as `code:%code url:%url type:%headers:content-type` is
//! rendered against a [`FormatValue`]. `%name` substitutes a top-level field
//! and is left untouched when no such field exists. `%a:b:c` walks nested
//! maps and renders an empty string as soon as a step is missing.

use crate::state::VisitRecord;
use std::collections::BTreeMap;

/// Separator used to render the parents trail
pub const PARENTS_SEPARATOR: &str = " --> ";

/// A value a format string can be rendered against
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<FormatValue>),
    Map(BTreeMap<String, FormatValue>),
}

impl FormatValue {
    /// Renders a scalar; lists are joined with `", "` and maps render empty
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::List(items) => items
                .iter()
                .map(FormatValue::render)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Map(_) => String::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FormatValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Follows a `:`-separated key path
    fn walk(&self, path: &str) -> Option<&FormatValue> {
        path.split(':')
            .try_fold(self, |current, segment| current.get(segment))
    }
}

impl From<&str> for FormatValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for FormatValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Option<String>> for FormatValue {
    fn from(s: Option<String>) -> Self {
        Self::Str(s.unwrap_or_default())
    }
}

impl From<i64> for FormatValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FormatValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Renders a format string against a value
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use visitor::output::{format_string, FormatValue};
///
/// let mut headers = BTreeMap::new();
/// headers.insert("server".to_string(), FormatValue::from("nginx"));
///
/// let mut data = BTreeMap::new();
/// data.insert("code".to_string(), FormatValue::from(200i64));
/// data.insert("headers".to_string(), FormatValue::Map(headers));
/// let data = FormatValue::Map(data);
///
/// assert_eq!(format_string("%code %headers:server", &data), "200 nginx");
/// assert_eq!(format_string("%headers:missing |", &data), " |");
/// assert_eq!(format_string("%unknown", &data), "%unknown");
/// ```
pub fn format_string(format: &str, data: &FormatValue) -> String {
    let mut result = String::with_capacity(format.len());
    let mut rest = format;

    while let Some(idx) = rest.find('%') {
        result.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let key_len = after
            .find(char::is_whitespace)
            .unwrap_or(after.len());
        let key = &after[..key_len];

        result.push_str(&render_key(key, data));
        rest = &after[key_len..];
    }

    result.push_str(rest);
    result
}

fn render_key(key: &str, data: &FormatValue) -> String {
    if key.is_empty() {
        return "%".to_string();
    }

    if let Some(value) = data.get(key) {
        return value.render();
    }

    if key.contains(':') {
        return data.walk(key).map(FormatValue::render).unwrap_or_default();
    }

    format!("%{}", key)
}

/// Converts a visit record into a format value
///
/// Header value lists are joined with `", "` and the parents trail with
/// `" --> "`.
pub fn visit_to_value(record: &VisitRecord) -> FormatValue {
    let headers = record
        .headers
        .iter()
        .map(|(name, values)| (name.clone(), FormatValue::Str(values.join(", "))))
        .collect();

    let mut map = BTreeMap::new();
    map.insert("url".to_string(), FormatValue::from(record.url.as_str()));
    map.insert("code".to_string(), FormatValue::from(i64::from(record.code)));
    map.insert(
        "content_type".to_string(),
        FormatValue::from(record.content_type.clone()),
    );
    map.insert("headers".to_string(), FormatValue::Map(headers));
    map.insert(
        "parents".to_string(),
        FormatValue::Str(record.parents.join(PARENTS_SEPARATOR)),
    );
    map.insert("parent".to_string(), FormatValue::from(record.parent.clone()));
    map.insert("is_internal".to_string(), FormatValue::from(record.is_internal));
    map.insert(
        "redirect_url".to_string(),
        FormatValue::from(record.redirect_url.clone()),
    );
    map.insert("state".to_string(), FormatValue::from(record.state.as_str()));
    map.insert("error".to_string(), FormatValue::from(record.error.clone()));

    FormatValue::Map(map)
}

/// Renders a visit record with a format string
pub fn format_visit(format: &str, record: &VisitRecord) -> String {
    format_string(format, &visit_to_value(record))
}
