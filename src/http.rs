//! Request and response types exchanged between the host, the cache stores
//! and the network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP request method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as seen by the fetch handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request URL, used verbatim as the cache key
    pub url: String,
    /// Method
    pub method: Method,
    /// Header name/value pairs in send order
    pub headers: Vec<(String, String)>,
    /// Request body (empty for GET/HEAD)
    pub body: Vec<u8>,
}

impl Request {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response, either stored in a cache or returned by the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// URL the response was produced for
    pub url: String,
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Body bytes
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with the given status and no body
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Create a 200 response with a body
    pub fn ok(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_text: "OK".to_string(),
            body: body.into(),
            ..Self::new(url, 200)
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
