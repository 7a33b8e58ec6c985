//! Escape and percent-encoding helpers.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Decodes backslash escapes in a declared variable value.
///
/// Recognized: `\n`, `\r`, `\t`, `\\`, `\"`, `\'`. Any other escape, and a
/// trailing lone backslash, is kept verbatim.
pub fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Percent-encodes a value for `{{%expr}}` expressions.
///
/// Only RFC 3986 unreserved characters (`A-Z a-z 0-9 - . _ ~`) pass through;
/// every other byte of the UTF-8 encoding becomes `%XX`. Spaces become `%20`,
/// never `+`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Unreserved characters plus the sub-delimiters and path characters.
const PATH_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/');

/// Path-style escaping for user-input values placed in URLs.
///
/// Unlike [`percent_encode`], the sub-delimiters and path characters
/// `! $ & ' ( ) * + , ; = : @ /` are left alone, so `a=b&c` survives intact.
/// Space, `#`, `?`, `%` and non-ASCII characters are escaped.
pub fn path_escape(value: &str) -> String {
    utf8_percent_encode(value, PATH_ESCAPE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_known_sequences() {
        assert_eq!(unescape(r"line1\nline2"), "line1\nline2");
        assert_eq!(unescape(r"a\tb\rc"), "a\tb\rc");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
    }

    #[test]
    fn test_unescape_keeps_unknown_and_trailing() {
        assert_eq!(unescape(r"C:\path"), r"C:\path");
        assert_eq!(unescape("end\\"), "end\\");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("a&b=c+d/e"), "a%26b%3Dc%2Bd%2Fe");
        assert_eq!(percent_encode("safe-._~"), "safe-._~");
        assert_eq!(percent_encode("é"), "%C3%A9");
        assert_eq!(percent_encode("user@host:8080"), "user%40host%3A8080");
    }

    #[test]
    fn test_path_escape_keeps_query_delimiters() {
        assert_eq!(path_escape("hello world"), "hello%20world");
        assert_eq!(path_escape("a=b&c+d/e"), "a=b&c+d/e");
        assert_eq!(path_escape("tag#1"), "tag%231");
        assert_eq!(path_escape("ü"), "%C3%BC");
        assert_eq!(path_escape("100%"), "100%25");
        assert_eq!(path_escape("!$'()*,;:@"), "!$'()*,;:@");
        assert_eq!(path_escape("a?b\"c"), "a%3Fb%22c");
    }
}
