//! YAML frontmatter parsing for stored notes
//!
//! Parses the metadata block at the start of a note:
//! ```markdown
//! ---
//! name: Leaf
//! tags: [garden]
//! ---
//!
//! Note body here, with [links](/other)...
//! ```

use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Parsed frontmatter as a map of string keys to JSON values.
pub type Frontmatter = HashMap<String, JsonValue>;

/// A parsed note with frontmatter separated from content.
///
/// The `content` field borrows from the raw note to avoid unnecessary allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote<'a> {
    /// The frontmatter key-value pairs, if present and valid YAML
    pub frontmatter: Option<Frontmatter>,
    /// The note body after the frontmatter
    pub content: &'a str,
}

/// Metadata every resolvable note must carry.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMeta<'a> {
    /// The display name from the `name` attribute
    pub name: String,
    /// The note body after the frontmatter
    pub body: &'a str,
}

impl<'a> NoteMeta<'a> {
    /// Parse the metadata block of a note.
    ///
    /// Returns None when there is no frontmatter block, the YAML is invalid,
    /// or `name` is missing or not a non-empty string.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let parsed = parse_frontmatter(raw);
        let frontmatter = parsed.frontmatter?;
        let name = frontmatter
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())?
            .to_string();

        Some(Self {
            name,
            body: parsed.content,
        })
    }
}

/// Split a note into frontmatter YAML string and content, without parsing the YAML.
///
/// Returns (frontmatter_yaml, content) where frontmatter_yaml is None if
/// no delimited block was found.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    // Frontmatter must start at the very beginning with ---
    let Some(after_opening) = raw.strip_prefix("---") else {
        return (None, raw);
    };

    let yaml_start = if let Some(rest) = after_opening.strip_prefix('\n') {
        rest
    } else if let Some(rest) = after_opening.strip_prefix("\r\n") {
        rest
    } else {
        // No newline after opening --- means invalid frontmatter
        return (None, raw);
    };

    match find_closing_delimiter(yaml_start) {
        Some((close_pos, after_close)) => {
            let yaml = &yaml_start[..close_pos];
            (Some(yaml), &yaml_start[after_close..])
        }
        None => (None, raw),
    }
}

/// Find the closing --- line.
///
/// Returns the byte offset where the delimiter line starts and the offset
/// just past its line ending.
fn find_closing_delimiter(s: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    for line in s.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" {
            return Some((pos, pos + line.len()));
        }
        pos += line.len();
    }
    None
}

/// Parse a note's raw content into frontmatter and content.
///
/// The frontmatter is parsed as YAML and converted to a HashMap with JSON values.
/// Invalid YAML, or YAML that is not a mapping, yields `frontmatter: None`.
pub fn parse_frontmatter(raw: &str) -> ParsedNote<'_> {
    let (yaml_str, content) = split_frontmatter(raw);

    let frontmatter = yaml_str.and_then(|yaml| {
        serde_yaml::from_str::<serde_yaml::Value>(yaml)
            .ok()
            .and_then(yaml_to_json_map)
    });

    ParsedNote {
        frontmatter,
        content,
    }
}

/// Convert a YAML value to a JSON HashMap (for the top-level frontmatter)
fn yaml_to_json_map(yaml: serde_yaml::Value) -> Option<Frontmatter> {
    match yaml {
        serde_yaml::Value::Mapping(map) => {
            let result: Frontmatter = map
                .into_iter()
                .filter_map(|(k, v)| match k {
                    serde_yaml::Value::String(key) => Some((key, yaml_to_json(v))),
                    _ => None,
                })
                .collect();
            if result.is_empty() { None } else { Some(result) }
        }
        _ => None,
    }
}

/// Convert a YAML value to a JSON value
fn yaml_to_json(yaml: serde_yaml::Value) -> JsonValue {
    match yaml {
        serde_yaml::Value::Null => JsonValue::Null,
        serde_yaml::Value::Bool(b) => JsonValue::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        serde_yaml::Value::String(s) => JsonValue::String(s),
        serde_yaml::Value::Sequence(seq) => {
            JsonValue::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let obj: serde_json::Map<String, JsonValue> = map
                .into_iter()
                .filter_map(|(k, v)| match k {
                    serde_yaml::Value::String(key) => Some((key, yaml_to_json(v))),
                    _ => None,
                })
                .collect();
            JsonValue::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}
