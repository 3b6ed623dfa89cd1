//! Access document: which keys may retrieve which files.
//!
//! The document is a hand-maintained JSON object mapping an opaque key to the
//! identifiers it unlocks:
//!
//! ```json
//! { "family": ["taxes-2025.pdf", "recipes.md"] }
//! ```
//!
//! It is loaded from disk on every check, so edits apply to the next request.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tokio::fs;

/// Errors loading the access document.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("failed to read access document: {0}")]
    Io(#[from] std::io::Error),
    #[error("access document is not a key -> identifiers object: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persisted key -> file-set authorization table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AccessDocument {
    grants: HashMap<String, HashSet<String>>,
}

impl AccessDocument {
    /// Load the document at `path`.
    ///
    /// A missing document is empty and grants nothing.
    pub async fn load(path: &Path) -> Result<Self, AccessError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No access document at {:?}, denying by default", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether any key in the ticket unlocks `id`.
    pub fn authorizes<S: AsRef<str>>(&self, ticket: &[S], id: &str) -> bool {
        ticket.iter().any(|key| {
            self.grants
                .get(key.as_ref())
                .is_some_and(|files| files.contains(id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(json: &str) -> AccessDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_authorizes_any_matching_key() {
        let doc = parse(r#"{"family": ["taxes.pdf"], "work": ["report.pdf"]}"#);

        assert!(doc.authorizes(&["nope", "family"], "taxes.pdf"));
        assert!(!doc.authorizes(&["work"], "taxes.pdf"));
        assert!(!doc.authorizes::<&str>(&[], "taxes.pdf"));
    }

    #[test]
    fn test_keys_are_exact() {
        let doc = parse(r#"{"family": ["taxes.pdf"]}"#);

        assert!(!doc.authorizes(&["Family"], "taxes.pdf"));
        assert!(!doc.authorizes(&["family "], "taxes.pdf"));
    }

    #[tokio::test]
    async fn test_load_parses_json_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("access.json");
        std::fs::write(&path, r#"{"family": ["taxes.pdf", "recipes.md"]}"#).unwrap();

        let doc = AccessDocument::load(&path).await.unwrap();
        assert!(doc.authorizes(&["family"], "recipes.md"));
    }

    #[tokio::test]
    async fn test_missing_document_grants_nothing() {
        let temp = TempDir::new().unwrap();
        let doc = AccessDocument::load(&temp.path().join("access.json"))
            .await
            .unwrap();
        assert_eq!(doc, AccessDocument::default());
    }

    #[tokio::test]
    async fn test_malformed_document_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("access.json");
        std::fs::write(&path, r#"["not", "an", "object"]"#).unwrap();

        let result = AccessDocument::load(&path).await;
        assert!(matches!(result, Err(AccessError::Malformed(_))));
    }
}
