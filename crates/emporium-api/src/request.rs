//! Outbound request description
//!
//! Requests are plain data so they can be cloned for a retry and inspected in tests.

use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Header map with case-insensitive names (stored lowercased).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Content-Type` and `Accept` set to JSON.
    pub fn json_defaults() -> Self {
        let mut headers = Self::new();
        headers.insert("Content-Type", "application/json");
        headers.insert("Accept", "application/json");
        headers
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `defaults` overlaid with `self`; on a name conflict `self` wins.
    pub fn layered_on(&self, defaults: &Headers) -> Headers {
        let mut merged = defaults.clone();
        for (name, value) in &self.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Files sent as `multipart/form-data`, all under the same form field
    Multipart { field: String, files: Vec<FilePart> },
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, TransportError> {
        let value =
            serde_json::to_value(body).map_err(|e| TransportError::Request(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn with_multipart(mut self, field: impl Into<String>, files: Vec<FilePart>) -> Self {
        self.body = RequestBody::Multipart {
            field: field.into(),
            files,
        };
        self
    }

    /// Merge `defaults` under the headers already set on this request.
    ///
    /// A multipart body never takes a default `Content-Type`: the boundary is
    /// chosen by the transport.
    pub fn with_default_headers(mut self, defaults: &Headers) -> Self {
        let mut defaults = defaults.clone();
        if matches!(self.body, RequestBody::Multipart { .. }) {
            defaults.remove("content-type");
        }
        self.headers = self.headers.layered_on(&defaults);
        self
    }

    /// `METHOD path` label for logs
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url.path())
    }
}
