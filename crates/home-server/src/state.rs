//! Application context shared by every handler.

use crate::config::Config;
use crate::status::StatusHub;
use crate::store::FileStore;

/// Everything a request may touch, built once at startup.
pub struct AppState {
    pub config: Config,
    /// Shared secret for mutating and administrative endpoints
    pub secret: String,
    pub store: FileStore,
    pub hub: StatusHub,
}

impl AppState {
    /// Build the context with a freshly generated secret.
    pub fn new(config: Config) -> Self {
        Self::with_secret(config, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_secret(config: Config, secret: impl Into<String>) -> Self {
        let store = FileStore::new(config.data_dir.clone(), config.access_file.clone());
        Self {
            config,
            secret: secret.into(),
            store,
            hub: StatusHub::new(),
        }
    }

    /// Exact comparison of a presented `pass` against the shared secret.
    pub fn is_authorized(&self, pass: Option<&str>) -> bool {
        pass == Some(self.secret.as_str())
    }
}
