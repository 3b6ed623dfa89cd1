//! home-server library: file store, note finder and live status.
//!
//! The binary is a thin layer over these modules; integration tests drive
//! the same router through [`http::router`].

pub mod access;
pub mod config;
pub mod error;
pub mod http;
pub mod resolver;
pub mod state;
pub mod status;
pub mod store;

// Re-export key types for convenience
pub use config::Config;
pub use error::ApiError;
pub use http::router;
pub use state::AppState;
pub use status::{StatusHub, StatusRecord, StatusUpdate, Subscription};
pub use store::{FileStore, StoreError, StoredFile};
