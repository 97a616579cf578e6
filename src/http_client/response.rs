//! Fetched response wrapper.

use std::collections::HashMap;

use crate::timestamp::Timestamp;

/// A fully-read HTTP response.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (builder style, mainly for tests and fakes).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response indicates rate limiting (429 or 503).
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429 || self.status == 503
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The capture instant an archive reports for this response.
    pub fn memento_datetime(&self) -> Option<Timestamp> {
        self.header("memento-datetime")
            .and_then(Timestamp::from_http_date)
    }

    /// Body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body as text (best effort UTF-8 conversion).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
