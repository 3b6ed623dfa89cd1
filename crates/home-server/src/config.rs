//! Runtime configuration

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default reserved identifier of the access document
pub const DEFAULT_ACCESS_FILE: &str = "access.json";

/// Default upload limit in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;

/// Settings fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage root holding every file, notes and the access document
    pub data_dir: PathBuf,
    /// Identifier of the access document inside `data_dir`
    pub access_file: String,
    /// Shell command run by the upgrade endpoint
    pub upgrade_command: Option<String>,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            access_file: DEFAULT_ACCESS_FILE.to_string(),
            upgrade_command: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }

    /// Validate settings and create the storage root if needed.
    pub fn prepare(&self) -> Result<()> {
        note_fs::validate_identifier(&self.access_file)
            .with_context(|| format!("Invalid access file name: {:?}", self.access_file))?;

        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;

        let access_path = self.data_dir.join(&self.access_file);
        if access_path.exists() {
            tracing::info!("Using access document {:?}", access_path);
        } else {
            tracing::warn!(
                "No access document at {:?}; only images are retrievable until one is written",
                access_path
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_data_dir() {
        let temp = TempDir::new().unwrap();
        let config = Config::new(temp.path().join("nested/data"));

        config.prepare().unwrap();
        assert!(temp.path().join("nested/data").is_dir());
    }

    #[test]
    fn test_prepare_rejects_unsafe_access_file() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::new(temp.path());
        config.access_file = "../access.json".to_string();

        assert!(config.prepare().is_err());
    }
}
