//! Fetch API
//!
//! JavaScript-style fetch() options. Every field is optional so the same
//! type describes base options and per-request overrides; [`FetchOptions::merge`]
//! layers one over the other.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::{FormData, Method, UrlSearchParams};

/// Header list with case-insensitive names, insertion ordered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get header value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any value under the same name
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Remove a header
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Key-by-key merge; `other` wins on conflicts
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in &other.entries {
            self.set(name, value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.set(&k.into(), v);
        }
        headers
    }
}

/// Scalar header values as they appear in JSON option blocks (`"X-PJAX": true`)
#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl HeaderValue {
    fn into_string(self) -> String {
        match self {
            HeaderValue::Str(s) => s,
            HeaderValue::Bool(b) => b.to_string(),
            HeaderValue::Int(i) => i.to_string(),
            HeaderValue::Float(f) => f.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, value)) = map.next_entry::<String, HeaderValue>()? {
                    headers.set(&name, value.into_string());
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Plain text
    Text(String),
    /// `application/x-www-form-urlencoded` pairs
    UrlEncoded(UrlSearchParams),
    /// Raw `multipart/form-data` payload
    Multipart(FormData),
}

/// Fetch options
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub method: Option<Method>,
    pub headers: Headers,
    #[serde(skip)]
    pub body: Option<RequestBody>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Effective method (GET when unset)
    pub fn request_method(&self) -> Method {
        self.method.unwrap_or_default()
    }

    /// Deep merge `overrides` on top of these options.
    ///
    /// Headers merge key-by-key. Method and body are replaced only when the
    /// override sets them, so a form payload survives a header-only override.
    pub fn merge(&mut self, overrides: FetchOptions) {
        if overrides.method.is_some() {
            self.method = overrides.method;
        }
        self.headers.merge(&overrides.headers);
        if overrides.body.is_some() {
            self.body = overrides.body;
        }
    }

    /// Non-mutating form of [`merge`](Self::merge)
    pub fn merged(&self, overrides: FetchOptions) -> FetchOptions {
        let mut out = self.clone();
        out.merge(overrides);
        out
    }
}
