//! Filesystem file store with per-request authorization.

use std::path::{Path, PathBuf};

use note_fs::{IdentifierError, is_image, is_note, validate_identifier};
use rand::Rng;
use tokio::fs;

use crate::access::{AccessDocument, AccessError};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identifier could address something outside the storage root
    #[error("invalid identifier '{id}': {source}")]
    InvalidIdentifier {
        id: String,
        #[source]
        source: IdentifierError,
    },
    /// The caller's ticket does not unlock the file
    #[error("access denied to '{id}'")]
    Denied { id: String },
    /// No content is stored under the identifier
    #[error("file not found: {id}")]
    NotFound { id: String },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes read from the store plus their inferred content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl StoredFile {
    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Flat file store rooted at a single directory.
///
/// Every identifier is one path segment directly inside the root. The access
/// document lives in the same directory under a reserved identifier and is
/// never served.
pub struct FileStore {
    root: PathBuf,
    access_id: String,
}

impl FileStore {
    /// Create a store over `root`, reserving `access_id` for the access document.
    pub fn new(root: PathBuf, access_id: impl Into<String>) -> Self {
        Self {
            root,
            access_id: access_id.into(),
        }
    }

    /// Location of the access document
    pub fn access_path(&self) -> PathBuf {
        self.root.join(&self.access_id)
    }

    /// Map an identifier to its location inside the root.
    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let clean = validate_identifier(id).map_err(|source| StoreError::InvalidIdentifier {
            id: id.to_string(),
            source,
        })?;
        Ok(self.root.join(clean))
    }

    fn is_reserved(&self, id: &str) -> bool {
        id == self.access_id
    }

    /// Generate a random hex string for temp file names.
    fn random_hex() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        hex::encode(bytes)
    }

    /// Write `content` under `id`, replacing anything already stored.
    ///
    /// Uses temp file + rename so readers never observe a partial file. The
    /// temp name is hidden, so enumeration never lists it, and independent of
    /// `id`, so any identifier the filesystem accepts can be stored.
    pub async fn store(&self, id: &str, content: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let temp_path = self.root.join(format!(".{}.tmp", Self::random_hex()));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::info!("Stored {} ({} bytes)", id, content.len());
        Ok(())
    }

    /// Retrieve `id` on behalf of a caller presenting `ticket`.
    ///
    /// Authorization always runs before the existence check, against the
    /// access document as it is on disk right now.
    pub async fn retrieve<S: AsRef<str>>(
        &self,
        id: &str,
        ticket: &[S],
    ) -> Result<StoredFile, StoreError> {
        let path = self.path_for(id)?;
        self.authorize(id, ticket).await?;
        Self::read_path(id, &path).await
    }

    /// Read a file without consulting the access document.
    ///
    /// Only the reserved access document is refused. Used for the public note
    /// graph.
    pub async fn read_public(&self, id: &str) -> Result<StoredFile, StoreError> {
        let path = self.path_for(id)?;
        if self.is_reserved(id) {
            return Err(StoreError::Denied { id: id.to_string() });
        }
        Self::read_path(id, &path).await
    }

    async fn authorize<S: AsRef<str>>(&self, id: &str, ticket: &[S]) -> Result<(), StoreError> {
        if self.is_reserved(id) {
            return Err(StoreError::Denied { id: id.to_string() });
        }
        if is_image(id) {
            return Ok(());
        }

        let document = AccessDocument::load(&self.access_path()).await?;
        if document.authorizes(ticket, id) {
            Ok(())
        } else {
            Err(StoreError::Denied { id: id.to_string() })
        }
    }

    async fn read_path(id: &str, path: &Path) -> Result<StoredFile, StoreError> {
        let content = fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound { id: id.to_string() }
            } else {
                StoreError::from(e)
            }
        })?;

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(StoredFile {
            id: id.to_string(),
            content,
            content_type,
        })
    }

    /// List every note identifier in the root, sorted.
    ///
    /// Hidden entries, directories and the access document are skipped.
    pub async fn list_notes(&self) -> Result<Vec<String>, StoreError> {
        let mut notes = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if name.starts_with('.') || self.is_reserved(name) || !is_note(name) {
                continue;
            }
            if entry.file_type().await?.is_file() {
                notes.push(name.to_string());
            }
        }

        notes.sort();
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NO_KEYS: &[&str] = &[];

    fn create_test_store() -> (TempDir, FileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf(), "access.json");
        (temp_dir, store)
    }

    fn write_access(temp: &TempDir, json: &str) {
        std::fs::write(temp.path().join("access.json"), json).unwrap();
    }

    #[tokio::test]
    async fn test_store_and_retrieve_binary_round_trip() {
        let (temp, store) = create_test_store();
        write_access(&temp, r#"{"k": ["blob.bin"]}"#);

        let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        store.store("blob.bin", &content).await.unwrap();

        let file = store.retrieve("blob.bin", &["k"]).await.unwrap();
        assert_eq!(file.content, content);
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let (temp, store) = create_test_store();
        write_access(&temp, r#"{"k": ["note.md"]}"#);

        store.store("note.md", b"version 1").await.unwrap();
        store.store("note.md", b"v2").await.unwrap();

        let file = store.retrieve("note.md", &["k"]).await.unwrap();
        assert_eq!(file.content, b"v2");
    }

    #[tokio::test]
    async fn test_store_leaves_no_temp_files() {
        let (temp, store) = create_test_store();
        store.store("a.txt", b"content").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_store_accepts_long_identifiers() {
        let (temp, store) = create_test_store();
        let id = format!("{}.bin", "a".repeat(240));
        write_access(&temp, &format!(r#"{{"k": ["{}"]}}"#, id));

        store.store(&id, b"x").await.unwrap();

        let file = store.retrieve(&id, &["k"]).await.unwrap();
        assert_eq!(file.content, b"x");
    }

    #[tokio::test]
    async fn test_images_are_public() {
        let (_temp, store) = create_test_store();
        store.store("cat.PNG", b"\x89PNG").await.unwrap();

        let file = store.retrieve("cat.PNG", NO_KEYS).await.unwrap();
        assert_eq!(file.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_unlisted_file_is_denied() {
        let (temp, store) = create_test_store();
        write_access(&temp, r#"{"k": ["other.pdf"]}"#);
        store.store("secret.pdf", b"%PDF").await.unwrap();

        let result = store.retrieve("secret.pdf", &["k"]).await;
        assert!(matches!(result, Err(StoreError::Denied { .. })));

        let result = store.retrieve("secret.pdf", NO_KEYS).await;
        assert!(matches!(result, Err(StoreError::Denied { .. })));
    }

    #[tokio::test]
    async fn test_access_document_is_never_served() {
        let (temp, store) = create_test_store();
        write_access(&temp, r#"{"k": ["access.json"]}"#);

        let result = store.retrieve("access.json", &["k"]).await;
        assert!(matches!(result, Err(StoreError::Denied { .. })));

        let result = store.read_public("access.json").await;
        assert!(matches!(result, Err(StoreError::Denied { .. })));
    }

    #[tokio::test]
    async fn test_authorized_missing_file_is_not_found() {
        let (temp, store) = create_test_store();
        write_access(&temp, r#"{"k": ["gone.pdf"]}"#);

        let result = store.retrieve("gone.pdf", &["k"]).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let result = store.retrieve("gone.png", NO_KEYS).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_access_document_is_reloaded_every_call() {
        let (temp, store) = create_test_store();
        store.store("doc.pdf", b"%PDF").await.unwrap();

        write_access(&temp, r#"{"k": []}"#);
        assert!(store.retrieve("doc.pdf", &["k"]).await.is_err());

        write_access(&temp, r#"{"k": ["doc.pdf"]}"#);
        assert!(store.retrieve("doc.pdf", &["k"]).await.is_ok());

        write_access(&temp, r#"{}"#);
        let result = store.retrieve("doc.pdf", &["k"]).await;
        assert!(matches!(result, Err(StoreError::Denied { .. })));
    }

    #[tokio::test]
    async fn test_rejects_identifiers_escaping_root() {
        let (temp, store) = create_test_store();
        let outside = temp.path().parent().unwrap().join("escaped.txt");

        for id in ["../escaped.txt", "a/../../escaped.txt", "..", "x/y/z", "..\\escaped.txt"] {
            let result = store.store(id, b"evil").await;
            assert!(
                matches!(result, Err(StoreError::InvalidIdentifier { .. })),
                "{id}"
            );

            let result = store.retrieve(id, &["k"]).await;
            assert!(
                matches!(result, Err(StoreError::InvalidIdentifier { .. })),
                "{id}"
            );
        }

        assert!(!outside.exists());
    }

    #[tokio::test]
    async fn test_list_notes_skips_everything_but_notes() {
        let (temp, store) = create_test_store();
        write_access(&temp, "{}");
        store.store("b.md", b"b").await.unwrap();
        store.store("a.md", b"a").await.unwrap();
        store.store("photo.png", b"png").await.unwrap();
        std::fs::write(temp.path().join(".hidden.md"), "h").unwrap();
        std::fs::create_dir(temp.path().join("dir.md")).unwrap();

        let notes = store.list_notes().await.unwrap();
        assert_eq!(notes, vec!["a.md".to_string(), "b.md".to_string()]);
    }
}
