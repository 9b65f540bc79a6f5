//! Legacy markdown escaping.
//!
//! The reserved set is exactly `- * _ +`: those four characters start list
//! items, emphasis runs and escape sequences in the legacy grammar, so they
//! are backslash-prefixed in literal text. Backslash itself is never
//! escaped, matching the legacy clients.

const RESERVED: [char; 4] = ['-', '*', '_', '+'];

pub(crate) fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn unescape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|next| RESERVED.contains(next)) {
            continue;
        }
        out.push(c);
    }
    out
}
