//! User-input placeholders
//!
//! `{{:name}}` and `{{:name!secret}}` mark values the user types in once per
//! endpoint. This pass runs before ordinary `{{...}}` resolution:
//!
//! 1. [`detect_user_inputs`] finds the distinct names in a request.
//! 2. [`collect_user_inputs`] reuses values remembered for the endpoint and
//!    prompts for the rest.
//! 3. [`replace_user_inputs`] (URLs, path-escaped) or
//!    [`replace_user_inputs_raw`] (headers and bodies, verbatim) splices them in.

use super::encoding::path_escape;
use super::system::Prompter;
use crate::session::UserInputStore;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use url::Url;

static USER_INPUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{:([A-Za-z_][A-Za-z0-9_]*)(!secret)?\}\}")
        .expect("user input pattern is valid")
});

/// One distinct `{{:name}}` placeholder found in a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInputPattern {
    pub name: String,
    /// Text of the first occurrence, e.g. `{{:id!secret}}`.
    pub original_text: String,
    /// Byte offset of the first occurrence.
    pub position: usize,
    /// True if any occurrence of this name carries `!secret`.
    pub is_secret: bool,
}

/// Finds the user-input placeholders in `content`, one per name, in order of
/// first appearance.
///
/// ```
/// use restfile::variables::user_input::detect_user_inputs;
///
/// let patterns = detect_user_inputs("/users/{{:id}}?token={{:id!secret}}");
/// assert_eq!(patterns.len(), 1);
/// assert!(patterns[0].is_secret);
/// ```
pub fn detect_user_inputs(content: &str) -> Vec<UserInputPattern> {
    let mut patterns: Vec<UserInputPattern> = Vec::new();

    for caps in USER_INPUT_REGEX.captures_iter(content) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let is_secret = caps.get(2).is_some();

        match patterns.iter_mut().find(|p| p.name == name.as_str()) {
            Some(existing) => existing.is_secret |= is_secret,
            None => patterns.push(UserInputPattern {
                name: name.as_str().to_string(),
                original_text: whole.as_str().to_string(),
                position: whole.start(),
                is_secret,
            }),
        }
    }

    patterns
}

pub fn has_user_inputs(content: &str) -> bool {
    USER_INPUT_REGEX.is_match(content)
}

/// Substitutes known values, path-escaping each one. For URLs.
///
/// Unknown names stay as literal `{{:name}}` text.
pub fn replace_user_inputs(content: &str, values: &HashMap<String, String>) -> String {
    replace_with(content, values, path_escape)
}

/// Substitutes known values verbatim. For header values, bodies and form fields.
pub fn replace_user_inputs_raw(content: &str, values: &HashMap<String, String>) -> String {
    replace_with(content, values, str::to_string)
}

/// Substitutes known values across a whole request.
///
/// The request line (the first line that is neither blank nor a `#` or `//`
/// comment) holds the URL and gets [`replace_user_inputs`]. Every other line
/// gets [`replace_user_inputs_raw`].
pub fn replace_user_inputs_in_request(content: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut seen_request_line = false;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        let is_request_line = !seen_request_line
            && !trimmed.is_empty()
            && !trimmed.starts_with('#')
            && !trimmed.starts_with("//");
        if is_request_line {
            seen_request_line = true;
            out.push_str(&replace_user_inputs(line, values));
        } else {
            out.push_str(&replace_user_inputs_raw(line, values));
        }
    }

    out
}

fn replace_with(
    content: &str,
    values: &HashMap<String, String>,
    render: impl Fn(&str) -> String,
) -> String {
    USER_INPUT_REGEX
        .replace_all(content, |caps: &Captures| {
            match caps.get(1).and_then(|name| values.get(name.as_str())) {
                Some(value) => render(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Builds the session key for a request URL: host, port, path and raw query.
///
/// Scheme, user-info and fragment are dropped, so `http://` and `https://`
/// variants of an endpoint share remembered values.
///
/// ```
/// use restfile::variables::user_input::generate_key;
///
/// assert_eq!(
///     generate_key("https://user:pw@api.example.com/users?page=2#top"),
///     generate_key("http://api.example.com/users?page=2"),
/// );
/// ```
pub fn generate_key(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(parsed) if parsed.has_host() => {
            let mut key = parsed.host_str().unwrap_or_default().to_string();
            if let Some(port) = parsed.port() {
                key.push(':');
                key.push_str(&port.to_string());
            }
            key.push_str(parsed.path());
            if let Some(query) = parsed.query() {
                key.push('?');
                key.push_str(query);
            }
            key
        }
        _ => fallback_key(trimmed),
    }
}

/// Key for URLs the parser rejects, such as `{{baseUrl}}/users`.
fn fallback_key(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_scheme = without_fragment
        .split_once("://")
        .map_or(without_fragment, |(_, rest)| rest);

    let authority_end = without_scheme.find('/').unwrap_or(without_scheme.len());
    match without_scheme[..authority_end].rfind('@') {
        Some(at) => without_scheme[at + 1..].to_string(),
        None => without_scheme.to_string(),
    }
}

/// Collects a value for every user-input placeholder in `content`.
///
/// Values remembered under `generate_key(url)` are reused. Missing ones are
/// asked for through `prompter` (secret patterns prompt as passwords). New
/// non-secret answers are written to `store`; secrets are never stored. A
/// failed or absent prompt leaves that placeholder unfilled.
pub fn collect_user_inputs(
    content: &str,
    url: &str,
    store: &mut UserInputStore,
    prompter: Option<&dyn Prompter>,
) -> HashMap<String, String> {
    let key = generate_key(url);
    let mut values = HashMap::new();

    for pattern in detect_user_inputs(content) {
        if !pattern.is_secret {
            if let Some(stored) = store.get(&key, &pattern.name) {
                debug!("reusing stored value for '{}' at {}", pattern.name, key);
                values.insert(pattern.name, stored);
                continue;
            }
        }

        let Some(prompter) = prompter else {
            debug!("no prompt handler for user input '{}'", pattern.name);
            continue;
        };

        match prompter.prompt(&pattern.name, &pattern.original_text, pattern.is_secret) {
            Ok(value) => {
                if !pattern.is_secret {
                    store.set(key.as_str(), pattern.name.as_str(), value.as_str());
                }
                values.insert(pattern.name, value);
            }
            Err(e) => warn!("input for '{}' was not provided: {}", pattern.name, e),
        }
    }

    values
}
