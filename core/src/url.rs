//! URL decomposition and query merging.
//!
//! # Design
//! Not a WHATWG URL parser. Inputs are the loose, URL-like strings UI code
//! builds by hand (`host:80/path?x=1`, no scheme, repeated parameters). The
//! output of [`join`] is also the registry key for in-flight requests. All
//! splits are first-occurrence, left to right, with one exception: when a
//! query is present the fragment is whatever follows the last `#`.
//!
//! Nothing here percent-encodes or decodes. Values round-trip verbatim.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The value(s) bound to one query parameter name.
///
/// A name maps to `Multi` as soon as it is seen a second time; values keep
/// their encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// All values as a slice, regardless of variant.
    pub fn values(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multi(values) => values,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                let first = std::mem::take(first);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Multi(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Multi(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for QueryValue {
    fn from(values: [&str; N]) -> Self {
        QueryValue::Multi(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered mapping from parameter name to [`QueryValue`].
///
/// Names iterate in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct parameter names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add one occurrence of `name`, promoting an existing single value to a
    /// list.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((name, QueryValue::Single(value))),
        }
    }

    /// Bind `name` to `value`, replacing any previous binding but keeping its
    /// position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (name, value) in iter {
            query.insert(name, value);
        }
        query
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Query
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Structural parts of a URL-like string. Produced by [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUrl {
    /// Scheme without `://`; empty when none was given.
    pub protocol: String,
    pub hostname: String,
    pub port: Option<String>,
    /// Always starts with `/`.
    pub path: String,
    pub query: Query,
    /// Includes the leading `#`, or empty.
    pub fragment: String,
    /// The trimmed input, verbatim.
    pub full_path: String,
}

impl ParsedUrl {
    /// `protocol://hostname:port/path`, without query or fragment.
    pub fn base(&self) -> String {
        let mut out = String::new();
        if !self.protocol.is_empty() {
            out.push_str(&self.protocol);
            out.push_str("://");
        }
        out.push_str(&self.hostname);
        if let Some(port) = &self.port {
            out.push(':');
            out.push_str(port);
        }
        out.push_str(&self.path);
        out
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())?;
        if !self.query.is_empty() {
            let mut segments = Vec::new();
            for (name, value) in self.query.iter() {
                push_segments(&mut segments, name, value.values().iter());
            }
            write!(f, "?{}", segments.join("&"))?;
        }
        f.write_str(&self.fragment)
    }
}

/// Decompose `raw` into its structural parts. Never fails.
pub fn parse(raw: &str) -> ParsedUrl {
    let full_path = raw.trim();

    let (before_query, query_str, fragment) = match full_path.split_once('?') {
        Some((before, rest)) => {
            let query_str = rest.split_once('#').map_or(rest, |(q, _)| q);
            let fragment = rest.rsplit_once('#').map_or("", |(_, f)| f);
            (before, query_str, fragment)
        }
        None => match full_path.split_once('#') {
            Some((before, fragment)) => (before, "", fragment),
            None => (full_path, "", ""),
        },
    };

    // Only `://` marks a scheme, so `host:80` stays a host with a port.
    let (protocol, host_port_path) = before_query
        .split_once("://")
        .unwrap_or(("", before_query));

    let (host_port, path) = match host_port_path.split_once('/') {
        Some((host_port, path)) => (host_port, format!("/{path}")),
        None => (host_port_path, "/".to_string()),
    };

    // Only the text up to a second `:` is the port.
    let (hostname, port) = match host_port.split_once(':') {
        Some((hostname, rest)) => {
            let port = rest.split(':').next().unwrap_or_default();
            (hostname, (!port.is_empty()).then(|| port.to_string()))
        }
        None => (host_port, None),
    };

    let mut query = Query::new();
    for pair in query_str.split('&').filter(|s| !s.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        query.append(name, value);
    }

    ParsedUrl {
        protocol: protocol.to_string(),
        hostname: hostname.to_string(),
        port,
        path,
        query,
        fragment: if fragment.is_empty() {
            String::new()
        } else {
            format!("#{fragment}")
        },
        full_path: full_path.to_string(),
    }
}

/// Merge `extra` into the query embedded in `raw` and re-serialize.
///
/// Values for a name already in `raw` accumulate: the embedded values come
/// first, then the extra ones. Empty values are dropped for those shared
/// names; names only present in `extra` keep empty values. With nothing to
/// put in the query the result is the bare base, fragment included only when
/// a query is emitted.
pub fn join(raw: &str, extra: &Query) -> String {
    let parsed = parse(raw);
    let mut url = parsed.base();
    if parsed.query.is_empty() && extra.is_empty() {
        return url;
    }

    let mut segments = Vec::new();
    for (name, value) in parsed.query.iter() {
        push_segments(&mut segments, name, non_empty(value));
        if let Some(extra_value) = extra.get(name) {
            push_segments(&mut segments, name, non_empty(extra_value));
        }
    }
    for (name, value) in extra.iter() {
        if !parsed.query.contains_key(name) {
            push_segments(&mut segments, name, value.values().iter());
        }
    }

    url.push('?');
    url.push_str(&segments.join("&"));
    url.push_str(&parsed.fragment);
    url
}

fn non_empty(value: &QueryValue) -> impl Iterator<Item = &String> {
    value.values().iter().filter(|v| !v.is_empty())
}

fn push_segments<'a>(
    segments: &mut Vec<String>,
    name: &str,
    values: impl Iterator<Item = &'a String>,
) {
    segments.extend(values.map(|value| format!("{name}={value}")));
}
