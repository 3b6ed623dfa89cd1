//! Identifier safety, suffix rules and frontmatter parsing for stored notes
//!
//! Every stored file lives directly in the storage root under a single path
//! segment. These are pure functions with no I/O; the server's file store
//! joins validated identifiers onto its root.

mod frontmatter;

pub use frontmatter::{Frontmatter, NoteMeta, ParsedNote, parse_frontmatter, split_frontmatter};

use std::path::{Component, Path};

/// Extension carried by every note (without the dot)
pub const NOTE_EXTENSION: &str = "md";

/// Extensions served without authorization
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "avif",
];

/// Reasons an identifier is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier contains a path separator")]
    Separator,
    #[error("identifier is a relative directory token or hidden name")]
    DotPrefixed,
    #[error("identifier contains control characters")]
    ControlCharacter,
    #[error("identifier is not a single path segment")]
    NotSingleSegment,
}

/// Validate that an identifier names exactly one file directly inside the
/// storage root.
///
/// The identifier is expected to be already percent-decoded. Anything that
/// could address a location outside the root is rejected, never rewritten.
pub fn validate_identifier(raw: &str) -> Result<&str, IdentifierError> {
    if raw.trim().is_empty() {
        return Err(IdentifierError::Empty);
    }

    if raw.contains(['/', '\\']) {
        return Err(IdentifierError::Separator);
    }

    // Covers ".", ".." and hidden files such as ".env"
    if raw.starts_with('.') {
        return Err(IdentifierError::DotPrefixed);
    }

    if raw.chars().any(char::is_control) {
        return Err(IdentifierError::ControlCharacter);
    }

    // Final check against the platform's own notion of a path
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(segment)), None) if segment == raw => Ok(raw),
        _ => Err(IdentifierError::NotSingleSegment),
    }
}

/// Returns the lowercase extension of an identifier, if any: "photo.JPG" -> "jpg"
pub fn extension(id: &str) -> Option<String> {
    Path::new(id)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether the identifier's suffix marks it as a public image
pub fn is_image(id: &str) -> bool {
    extension(id).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the identifier carries the note suffix
pub fn is_note(id: &str) -> bool {
    extension(id).is_some_and(|ext| ext == NOTE_EXTENSION)
}

/// Append the note suffix unless the identifier already carries it.
///
/// Any other dotted tail is part of the name: "v1.2" -> "v1.2.md"
pub fn ensure_note_suffix(id: &str) -> String {
    if is_note(id) {
        id.to_string()
    } else {
        format!("{}.{}", id, NOTE_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_plain_names() {
        assert_eq!(validate_identifier("leaf.md"), Ok("leaf.md"));
        assert_eq!(validate_identifier("My Photo.png"), Ok("My Photo.png"));
        assert_eq!(validate_identifier("archive.tar.gz"), Ok("archive.tar.gz"));
    }

    #[test]
    fn validate_rejects_every_separator() {
        for id in [
            "a/b",
            "a/b/c",
            "/etc/passwd",
            "../secret",
            "../../evil",
            "a\\b",
            "..\\..\\evil",
            "notes/",
        ] {
            assert_eq!(
                validate_identifier(id),
                Err(IdentifierError::Separator),
                "{id}"
            );
        }
    }

    #[test]
    fn validate_rejects_dot_tokens() {
        assert_eq!(validate_identifier("."), Err(IdentifierError::DotPrefixed));
        assert_eq!(validate_identifier(".."), Err(IdentifierError::DotPrefixed));
        assert_eq!(validate_identifier(".env"), Err(IdentifierError::DotPrefixed));
    }

    #[test]
    fn validate_rejects_empty_and_control() {
        assert_eq!(validate_identifier(""), Err(IdentifierError::Empty));
        assert_eq!(validate_identifier("   "), Err(IdentifierError::Empty));
        assert_eq!(
            validate_identifier("a\0b"),
            Err(IdentifierError::ControlCharacter)
        );
        assert_eq!(
            validate_identifier("a\nb"),
            Err(IdentifierError::ControlCharacter)
        );
    }

    #[test]
    fn image_suffixes_are_case_insensitive() {
        assert!(is_image("photo.PNG"));
        assert!(is_image("photo.jpeg"));
        assert!(!is_image("photo.pdf"));
        assert!(!is_image("png"));
    }

    #[test]
    fn note_suffix_rules() {
        assert!(is_note("leaf.md"));
        assert!(!is_note("leaf"));
        assert_eq!(ensure_note_suffix("leaf"), "leaf.md");
        assert_eq!(ensure_note_suffix("leaf.md"), "leaf.md");
        assert_eq!(ensure_note_suffix("Leaf.MD"), "Leaf.MD");
        assert_eq!(ensure_note_suffix("v1.2"), "v1.2.md");
        assert_eq!(ensure_note_suffix("Mr. Smith"), "Mr. Smith.md");
        assert_eq!(ensure_note_suffix("photo.png"), "photo.png.md");
    }
}
