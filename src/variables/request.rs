//! Request chaining
//!
//! Later requests can reference the captured response of an earlier named
//! request with `requestName.response.(headers|body).path`:
//!
//! - `login.response.body.*` returns the raw body
//! - `login.response.body.$.token` evaluates a mini JSON path on the body
//! - `login.response.headers.X-Session-Id` returns the first value of a header
//!
//! # Examples
//!
//! ```
//! use restfile::models::RequestResult;
//! use restfile::variables::request::{resolve_request_variable, RequestResults};
//!
//! let mut results = RequestResults::new();
//! results.set("login", RequestResult::new(200).with_body(r#"{"token": "abc123"}"#));
//!
//! let token = resolve_request_variable(&results, "login.response.body.$.token").unwrap();
//! assert_eq!(token, "abc123");
//! ```

use super::jsonpath::extract_json_path;
use super::provider::{Variable, VariableKind, VariableProvider};
use super::VarError;
use crate::models::RequestResult;
use log::debug;
use std::collections::HashMap;

/// Whether an expression has the shape of a request-chain reference.
pub fn is_request_reference(expression: &str) -> bool {
    expression.contains(".response.") || expression.contains(".request.")
}

/// Response snapshots registered during one file's execution run.
#[derive(Debug, Clone, Default)]
pub struct RequestResults {
    results: HashMap<String, RequestResult>,
}

impl RequestResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the snapshot for a named request. A later registration under
    /// the same name replaces the earlier one.
    pub fn set(&mut self, name: impl Into<String>, result: RequestResult) {
        let name = name.into();
        debug!(
            "registering response for request '{}' (status {})",
            name, result.status_code
        );
        self.results.insert(name, result);
    }

    /// The registered snapshot for a request name.
    pub fn snapshot(&self, name: &str) -> Option<&RequestResult> {
        self.results.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

impl VariableProvider for RequestResults {
    fn kind(&self) -> VariableKind {
        VariableKind::RequestChain
    }

    fn has(&self, name: &str) -> bool {
        is_request_reference(name)
            && name
                .split_once('.')
                .is_some_and(|(request, _)| self.contains(request))
    }

    fn get(&self, name: &str) -> Result<Variable, VarError> {
        resolve_request_variable(self, name)
            .map(|value| Variable::new(name, value, VariableKind::RequestChain))
    }
}

/// Resolves `requestName.response.(headers|body).path` against the registry.
///
/// The expression is split on its first three dots; everything after the
/// third dot, further dots included, is the path.
pub fn resolve_request_variable(
    results: &RequestResults,
    expression: &str,
) -> Result<String, VarError> {
    let mut parts = expression.splitn(4, '.');
    let (Some(request_name), Some(source), Some(section), Some(path)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VarError::InvalidSyntax(format!(
            "request reference must be name.response.(headers|body).path: {}",
            expression
        )));
    };

    match source {
        "response" => {}
        "request" => {
            return Err(VarError::InvalidSyntax(format!(
                "request-side references are not supported: {}",
                expression
            )))
        }
        other => {
            return Err(VarError::InvalidSyntax(format!(
                "expected 'response' after request name, got '{}'",
                other
            )))
        }
    }

    let result = results
        .snapshot(request_name)
        .ok_or_else(|| VarError::RequestNotFound(request_name.to_string()))?;

    match section {
        "body" => extract_body_value(result, path),
        "headers" => extract_header_value(result, path),
        other => Err(VarError::InvalidSyntax(format!(
            "expected 'headers' or 'body', got '{}'",
            other
        ))),
    }
}

fn extract_body_value(result: &RequestResult, path: &str) -> Result<String, VarError> {
    if path == "*" {
        return Ok(result.body.clone());
    }
    if path.starts_with("$.") || path.starts_with("$[") {
        return extract_json_path(&result.body, path);
    }
    Err(VarError::InvalidSyntax(format!(
        "unsupported body path '{}': use '*' or a JSON path starting with '$.'",
        path
    )))
}

fn extract_header_value(result: &RequestResult, header_name: &str) -> Result<String, VarError> {
    result
        .header(header_name)
        .map(str::to_string)
        .ok_or_else(|| VarError::HeaderNotFound(header_name.to_string()))
}
