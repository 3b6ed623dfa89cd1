//! Parser for markdown inline links
//!
//! Supports:
//! - Basic links: `[Label](target)`
//! - Absolute targets: `[Leaf](/leaf)`
//! - Titles: `[Label](target "Title")`
//! - Angle-bracket targets: `[Label](<target with spaces>)`
//! - Fragments and queries: `[Label](/note#section)`
//! - Embeds: `![alt](/image.png)`
//! - Percent-encoded targets: `[Label](/my%20note)`

use std::borrow::Cow;
use std::collections::HashSet;

/// Marker that makes a link target absolute-style (relative to the store root).
pub const ABSOLUTE_MARKER: char = '/';

/// A parsed inline link from markdown content.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// The text between the square brackets: "Label"
    pub label: String,
    /// The raw destination without title: "/leaf#intro"
    pub target: String,
    /// Optional link title: `"Title"` without quotes
    pub title: Option<String>,
    /// Whether this is an embed (`![...](...)`)
    pub is_embed: bool,
}

impl Link {
    /// Returns the target without any `#fragment` or `?query`: "/leaf"
    pub fn path(&self) -> &str {
        let end = self
            .target
            .find(['#', '?'])
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// Whether the target starts with the absolute-style marker.
    ///
    /// Protocol-relative targets (`//host/path`) are not absolute-style.
    pub fn is_absolute(&self) -> bool {
        let path = self.path();
        path.starts_with(ABSOLUTE_MARKER) && !path[1..].starts_with(ABSOLUTE_MARKER)
    }

    /// Returns the path with the absolute marker stripped, or None for
    /// relative and external targets: `/leaf#intro` -> `leaf`
    pub fn absolute_target(&self) -> Option<&str> {
        if !self.is_absolute() {
            return None;
        }
        let stripped = &self.path()[1..];
        if stripped.is_empty() {
            None
        } else {
            Some(stripped)
        }
    }
}

/// Parse all inline links from markdown content
pub fn parse_links(content: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if chars[i] == '[' {
            let is_embed = i > 0 && chars[i - 1] == '!';
            if let Some((link, end)) = parse_link_at(&chars, i, is_embed) {
                links.push(link);
                i = end;
                continue;
            }
        }
        i += 1;
    }

    links
}

/// Parse a link starting at position `start` (pointing to `[`)
/// Returns the parsed link and the position after the closing `)`
fn parse_link_at(chars: &[char], start: usize, is_embed: bool) -> Option<(Link, usize)> {
    let len = chars.len();
    let label_end = find_closing(chars, start, '[', ']')?;

    // Destination must follow the label immediately
    let open_paren = label_end + 1;
    if open_paren >= len || chars[open_paren] != '(' {
        return None;
    }
    let close_paren = find_closing(chars, open_paren, '(', ')')?;

    let label: String = chars[start + 1..label_end].iter().collect();
    let destination: String = chars[open_paren + 1..close_paren].iter().collect();
    let (target, title) = parse_destination(&destination)?;

    Some((
        Link {
            label,
            target,
            title,
            is_embed,
        },
        close_paren + 1,
    ))
}

/// Find the index of the delimiter closing the one at `start`.
/// Nesting is tracked and links never span lines.
fn find_closing(chars: &[char], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            return None;
        }
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}

/// Split the text inside `( )` into target and optional title.
///
/// Anything after the target other than one quoted title means this is not
/// a link: `(/Mr. Smith)` is rejected rather than read as `/Mr.`.
fn parse_destination(raw: &str) -> Option<(String, Option<String>)> {
    let raw = raw.trim();

    // <target with spaces> "title"
    let (target, rest) = if let Some(inner) = raw.strip_prefix('<') {
        let end = inner.find('>')?;
        (&inner[..end], &inner[end + 1..])
    } else {
        match raw.find(char::is_whitespace) {
            Some(pos) => (&raw[..pos], &raw[pos..]),
            None => (raw, ""),
        }
    };
    if target.is_empty() {
        return None;
    }

    let rest = rest.trim();
    let title = if rest.is_empty() {
        None
    } else {
        Some(parse_title(rest)?)
    };

    Some((target.to_string(), title))
}

/// Parse a `"title"`, `'title'` or `(title)`; None for anything else.
fn parse_title(rest: &str) -> Option<String> {
    let quotes = [('"', '"'), ('\'', '\''), ('(', ')')];
    for (open, close) in quotes {
        if rest.len() >= 2 && rest.starts_with(open) && rest.ends_with(close) {
            let inner = &rest[1..rest.len() - 1];
            // An unescaped closing quote inside means trailing junk: `"a" b"`
            if inner.contains(close) {
                return None;
            }
            return Some(inner.to_string());
        }
    }
    None
}

/// Percent-decode a target: "my%20note" -> "my note".
///
/// Targets that do not decode to UTF-8 are kept as written.
pub fn decode_target(target: &str) -> Cow<'_, str> {
    urlencoding::decode(target).unwrap_or(Cow::Borrowed(target))
}

/// Extract all unique absolute-style targets (marker stripped, percent-decoded)
/// from content, in order of first appearance.
pub fn extract_absolute_targets(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for link in parse_links(content) {
        if let Some(target) = link.absolute_target() {
            let target = decode_target(target).into_owned();
            if seen.insert(target.clone()) {
                result.push(target);
            }
        }
    }

    result
}
