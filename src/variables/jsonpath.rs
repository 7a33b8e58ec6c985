//! Minimal JSON-path extraction over raw response text.
//!
//! Supports the `$.field.sub[index]` subset only: dot-separated field names,
//! each optionally followed by a single `[index]`. There are no wildcards,
//! filters or slices. The body is never parsed into a tree; each segment is
//! located with a key search and a single-pass value scanner, and the raw
//! substring of the value is returned.
//!
//! ```
//! use restfile::variables::jsonpath::extract_json_path;
//!
//! let body = r#"{"user":{"name":"John"},"items":["a","b"]}"#;
//! assert_eq!(extract_json_path(body, "$.user.name").unwrap(), "John");
//! assert_eq!(extract_json_path(body, "$.items[1]").unwrap(), "b");
//! assert!(extract_json_path(body, "$.missing").is_err());
//! ```

use super::VarError;

/// A single path segment: an optional field name and an optional array index.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment<'a> {
    field: &'a str,
    index: Option<usize>,
}

/// Evaluates `path` against the raw JSON text `json`.
///
/// String results have their surrounding quotes stripped (escape sequences are
/// left as written). Objects, arrays, numbers, booleans and `null` are returned
/// as raw, unformatted JSON substrings.
pub fn extract_json_path(json: &str, path: &str) -> Result<String, VarError> {
    let segments = parse_path(path)?;

    let mut current = json.trim();
    for segment in &segments {
        if !segment.field.is_empty() {
            current = find_field(current, segment.field)?;
        }
        if let Some(index) = segment.index {
            current = array_element(current, index, segment.field)?;
        }
    }

    Ok(strip_quotes(current).to_string())
}

/// Splits a `$.a.b[0]` path into segments.
fn parse_path(path: &str) -> Result<Vec<Segment<'_>>, VarError> {
    let path = path.trim();
    let rest = if let Some(rest) = path.strip_prefix("$.") {
        rest
    } else if let Some(rest) = path.strip_prefix('$') {
        // `$` alone selects the whole body; `$[n]` indexes a top-level array.
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(VarError::JsonPath(format!("unsupported path '{}'", path)));
        }
        rest
    } else {
        return Err(VarError::JsonPath(format!(
            "path '{}' must start with '$.' or '$['",
            path
        )));
    };

    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split('.').map(|raw| parse_segment(raw, path)).collect()
}

fn parse_segment<'a>(raw: &'a str, path: &str) -> Result<Segment<'a>, VarError> {
    let invalid = || VarError::JsonPath(format!("invalid segment '{}' in '{}'", raw, path));

    let Some(open) = raw.find('[') else {
        if raw.is_empty() || raw.contains(']') {
            return Err(invalid());
        }
        return Ok(Segment {
            field: raw,
            index: None,
        });
    };

    let index_text = raw[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
    let index = index_text.trim().parse::<usize>().map_err(|_| invalid())?;

    Ok(Segment {
        field: &raw[..open],
        index: Some(index),
    })
}

/// Locates the first `"key":` occurrence and returns the raw value after it.
fn find_field<'a>(text: &'a str, key: &str) -> Result<&'a str, VarError> {
    let quoted = format!("\"{}\"", key);
    let bytes = text.as_bytes();

    let colon = text
        .match_indices(quoted.as_str())
        .map(|(at, _)| skip_whitespace(bytes, at + quoted.len()))
        .find(|&pos| bytes.get(pos) == Some(&b':'))
        .ok_or_else(|| VarError::JsonPath(format!("field '{}' not found", key)))?;

    let (start, end) = scan_value(text, colon + 1)
        .ok_or_else(|| VarError::JsonPath(format!("malformed value for field '{}'", key)))?;

    Ok(&text[start..end])
}

/// Walks the raw array `text` and returns its `index`-th element.
fn array_element<'a>(text: &'a str, index: usize, field: &str) -> Result<&'a str, VarError> {
    let bytes = text.as_bytes();
    let not_array = || VarError::JsonPath(format!("'{}' is not an array", field));
    let out_of_range = || {
        VarError::JsonPath(format!(
            "index {} out of bounds for '{}'",
            index, field
        ))
    };

    let mut pos = skip_whitespace(bytes, 0);
    if bytes.get(pos) != Some(&b'[') {
        return Err(not_array());
    }
    pos += 1;

    let mut current = 0;
    loop {
        pos = skip_whitespace(bytes, pos);
        match bytes.get(pos) {
            None | Some(b']') => return Err(out_of_range()),
            _ => {}
        }

        let (start, end) = scan_value(text, pos).ok_or_else(not_array)?;
        if current == index {
            return Ok(&text[start..end]);
        }
        current += 1;

        pos = skip_whitespace(bytes, end);
        match bytes.get(pos) {
            Some(b',') => pos += 1,
            Some(b']') | None => return Err(out_of_range()),
            Some(_) => return Err(not_array()),
        }
    }
}

/// Scans one JSON value starting at `from` (leading whitespace allowed).
///
/// Returns the byte range of the value, or `None` if it is empty or unterminated.
fn scan_value(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = skip_whitespace(bytes, from);

    match *bytes.get(start)? {
        b'"' => scan_string(bytes, start).map(|end| (start, end)),
        open @ (b'{' | b'[') => {
            let close = if open == b'{' { b'}' } else { b']' };
            scan_composite(bytes, start, open, close).map(|end| (start, end))
        }
        _ => {
            let mut end = start;
            while end < bytes.len() && !is_token_terminator(bytes[end]) {
                end += 1;
            }
            (end > start).then_some((start, end))
        }
    }
}

/// Returns the index just past the closing quote of the string opening at `start`.
fn scan_string(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Balances `open`/`close` from `start`, ignoring brackets inside strings.
fn scan_composite(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            i = scan_string(bytes, i)?;
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn is_token_terminator(b: u8) -> bool {
    matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace()
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
