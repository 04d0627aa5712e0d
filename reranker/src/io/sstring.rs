//! Serializable strings.
//!
//! Tokens that consist of graphic ASCII characters other than `%`, `(`, `)`, `\` and `"` are
//! written as they are. Everything else is written between double quotes, with quotes and
//! backslashes escaped and control characters written as C escapes.

use std::borrow::Cow;

fn dont_escape(c: char) -> bool {
    c.is_ascii_graphic() && !['%', '(', ')', '\\', '"'].contains(&c)
}

/// Quote `s` if it contains reserved characters.
pub fn quote(s: &str) -> Cow<str> {
    if s.is_empty() {
        return Cow::Borrowed("\"\"");
    }
    if s.chars().all(dont_escape) {
        return Cow::Borrowed(s);
    }
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\x07' => quoted.push_str("\\a"),
            '\x08' => quoted.push_str("\\b"),
            '\x0c' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\x0b' => quoted.push_str("\\v"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Undo `quote`.
///
/// Tokens that do not start and end with a double quote are returned unchanged.
pub fn unquote(token: &str) -> Cow<str> {
    if token.len() < 2 || !token.starts_with('"') || !token.ends_with('"') {
        return Cow::Borrowed(token);
    }
    let inner = &token[1..token.len() - 1];
    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unquoted.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => unquoted.push('\x07'),
            Some('b') => unquoted.push('\x08'),
            Some('f') => unquoted.push('\x0c'),
            Some('n') => unquoted.push('\n'),
            Some('r') => unquoted.push('\r'),
            Some('t') => unquoted.push('\t'),
            Some('v') => unquoted.push('\x0b'),
            Some(c) => unquoted.push(c),
            None => unquoted.push('\\'),
        }
    }
    Cow::Owned(unquoted)
}
