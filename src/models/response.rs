//! Captured response snapshots.
//!
//! After a named request executes, the execution pipeline registers a
//! `RequestResult` under the request's name so that later requests in the same
//! run can reference its status, headers and body.

use serde::{Deserialize, Serialize};

/// Snapshot of a completed HTTP exchange, as seen by request chaining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResult {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status_code: u16,

    /// Response headers in the order they were received.
    ///
    /// A header name may appear more than once; lookups return the first value.
    pub headers: Vec<(String, String)>,

    /// Raw response body text.
    pub body: String,
}

impl RequestResult {
    /// Creates a new snapshot with the given status code, no headers and an empty body.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Builder-style helper that sets the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder-style helper that appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Appends a header, keeping any earlier value with the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Returns the first value of a header, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
