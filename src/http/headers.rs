//! HTTP headers handling
//!
//! This module provides a type for managing HTTP headers with normalized
//! names and an ordered list of values per name.
//!
//! Names are normalized on every access: lowercased, `_` translated to `-`,
//! and a leading `http-` stripped, so `HTTP_X_FORWARDED_FOR`,
//! `X-Forwarded-For` and `x_forwarded_for` all address `x-forwarded-for`.

use super::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// Header names whose raw value is kept whole instead of comma-split
const UNSPLIT_HEADERS: &[&str] = &["user-agent"];

/// One or more values for a header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderValues(Vec<String>);

impl HeaderValues {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        HeaderValues(vec![value.to_string()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        HeaderValues(vec![value])
    }
}

impl From<&String> for HeaderValues {
    fn from(value: &String) -> Self {
        HeaderValues(vec![value.clone()])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        HeaderValues(values)
    }
}

impl From<Vec<&str>> for HeaderValues {
    fn from(values: Vec<&str>) -> Self {
        HeaderValues(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValues {
    fn from(values: [&str; N]) -> Self {
        HeaderValues(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        HeaderValues(values.iter().map(|v| v.to_string()).collect())
    }
}

/// HTTP headers collection
///
/// Headers are stored in insertion order and support:
/// - Normalized header name lookups
/// - Multiple values for the same header name
/// - Iteration over all headers
///
/// `Headers` is a plain value: cloning a message clones its headers, so
/// mutating a copy never affects the original.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    data: IndexMap<String, Vec<String>>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers {
            data: IndexMap::new(),
        }
    }

    /// Build headers from raw name/value pairs.
    ///
    /// Each raw value is split on commas and every segment trimmed, except
    /// for headers such as `User-Agent` whose value is kept whole. A later
    /// pair whose name normalizes to an earlier one replaces it.
    pub fn from_raw<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut data = IndexMap::new();
        for (name, value) in raw {
            let name = Self::normalize_name(name.as_ref());
            let values = Self::normalize_value(&name, value.as_ref());
            data.insert(name, values);
        }
        Headers { data }
    }

    /// Normalize a header name: lowercase, `_` to `-`, strip `http-`.
    ///
    /// Only one `http-` prefix is stripped per call.
    pub fn normalize_name(name: &str) -> String {
        let name = name.to_lowercase().replace('_', "-");
        match name.strip_prefix("http-") {
            Some(stripped) => stripped.to_string(),
            None => name,
        }
    }

    fn normalize_value(name: &str, value: &str) -> Vec<String> {
        if UNSPLIT_HEADERS.contains(&name) {
            vec![value.to_string()]
        } else {
            value.split(',').map(|v| v.trim().to_string()).collect()
        }
    }

    /// Check that a header name is a valid RFC 7230 token.
    pub fn validate_name(name: &str) -> Result<()> {
        let is_tchar = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c);

        if name.is_empty() {
            return Err(Error::InvalidHeader("Empty header name".to_string()));
        }
        if !name.chars().all(is_tchar) {
            return Err(Error::InvalidHeader(format!("Invalid header name: {:?}", name)));
        }
        Ok(())
    }

    /// Add values to a header
    ///
    /// If the header already exists, the new values are appended rather
    /// than replacing the existing ones.
    pub fn add(&mut self, name: &str, values: impl Into<HeaderValues>) {
        let name = Self::normalize_name(name);
        self.data
            .entry(name)
            .or_default()
            .extend(values.into().into_vec());
    }

    /// Set a header, replacing any existing values
    pub fn set(&mut self, name: &str, values: impl Into<HeaderValues>) {
        let name = Self::normalize_name(name);
        self.data.insert(name, values.into().into_vec());
    }

    /// Get all values for a header, or an empty slice if absent
    pub fn get(&self, name: &str) -> &[String] {
        self.data
            .get(&Self::normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Get the values of a header joined by commas
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(",")
    }

    /// Check if a header exists
    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(&Self::normalize_name(name))
    }

    /// Remove a header; no-op if absent
    pub fn remove(&mut self, name: &str) {
        self.data.shift_remove(&Self::normalize_name(name));
    }

    /// Get the full name to values mapping
    pub fn all(&self) -> &IndexMap<String, Vec<String>> {
        &self.data
    }

    /// Get the number of distinct header names
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all headers
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.data.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, values) in &self.data {
            writeln!(f, "{}: {}", name, values.join(","))?;
        }
        Ok(())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Headers::from_raw(iter)
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(raw: [(K, V); N]) -> Self {
        Headers::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(Headers::normalize_name("HTTP_X_Foo"), "x-foo");
        assert_eq!(Headers::normalize_name("Content-Type"), "content-type");
        assert_eq!(Headers::normalize_name("CONTENT_LENGTH"), "content-length");
        assert_eq!(Headers::normalize_name("http-host"), "host");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        for name in ["HTTP_X_Foo", "Accept-Encoding", "PHP_AUTH_USER"] {
            let once = Headers::normalize_name(name);
            assert_eq!(Headers::normalize_name(&once), once);
        }
    }

    #[test]
    fn test_from_raw_splits_values() {
        let headers = Headers::from_raw([("HTTP_X_FOO", "a, b")]);
        assert_eq!(headers.get("x-foo"), ["a", "b"]);
        assert_eq!(headers.get("X-Foo"), ["a", "b"]);
    }

    #[test]
    fn test_from_raw_keeps_user_agent_whole() {
        let agent = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101, Firefox/115.0";
        let headers = Headers::from_raw([("HTTP_USER_AGENT", agent)]);
        assert_eq!(headers.get("user-agent"), [agent]);
    }

    #[test]
    fn test_add_merges() {
        let mut headers = Headers::from_raw([("Accept", "text/html")]);
        headers.add("accept", "application/json");
        headers.add("ACCEPT", ["text/plain", "*/*"]);
        assert_eq!(
            headers.get("Accept"),
            ["text/html", "application/json", "text/plain", "*/*"]
        );

        headers.add("X-New", "1");
        assert_eq!(headers.get("x-new"), ["1"]);
    }

    #[test]
    fn test_set_replaces() {
        let mut headers = Headers::from_raw([("Accept", "text/html, text/plain")]);
        headers.set("Accept", "application/json");
        assert_eq!(headers.get("accept"), ["application/json"]);
    }

    #[test]
    fn test_get_missing() {
        let headers = Headers::new();
        assert!(headers.get("Missing").is_empty());
        assert_eq!(headers.get_line("Missing"), "");
    }

    #[test]
    fn test_get_line() {
        let headers = Headers::from_raw([("Cache-Control", "no-cache, no-store")]);
        assert_eq!(headers.get_line("cache-control"), "no-cache,no-store");
    }

    #[test]
    fn test_contains_and_remove() {
        let mut headers = Headers::from_raw([("X-Remove", "1"), ("X-Keep", "2")]);
        assert!(headers.contains("x_remove"));
        headers.remove("X-Remove");
        headers.remove("X-Never-There");
        assert!(!headers.contains("X-Remove"));
        assert!(headers.contains("X-Keep"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_insertion_order() {
        let headers: Headers = [("C", "3"), ("A", "1"), ("B", "2")].into_iter().collect();
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_validate_name() {
        assert!(Headers::validate_name("X-Custom_Header").is_ok());
        assert!(Headers::validate_name("").is_err());
        assert!(Headers::validate_name("Bad Header").is_err());
        assert!(Headers::validate_name("Bad:Header").is_err());
    }

    #[test]
    fn test_display() {
        let headers = Headers::from_raw([("Host", "example.com"), ("Accept", "a, b")]);
        assert_eq!(headers.to_string(), "host: example.com\naccept: a,b\n");
    }
}
