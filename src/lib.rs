//! authrelay - an authenticated API client layer.
//!
//! Mediates every outbound API call on behalf of a logged-in user:
//! attaches the bearer token, forwards session cookies for
//! server-rendered call paths, and transparently recovers from an
//! expired access token with a single coordinated refresh before one
//! retry of the failed request.
//!
//! ```no_run
//! use std::sync::Arc;
//! use authrelay::{ApiClient, Config, Credentials, MemoryTokenStorage, SessionStore};
//!
//! # async fn run() -> Result<(), authrelay::ApiError> {
//! let config = Config::new("https://api.example.com", "https://app.example.com");
//! let session = SessionStore::new(config, Box::new(MemoryTokenStorage::new()))?;
//! let client = ApiClient::new(Arc::clone(&session));
//!
//! session.login(&Credentials::new("me@example.com", "secret")).await?;
//! let projects: serde_json::Value = client.get("/projects").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    FileTokenStorage, KeyringTokenStorage, MemoryTokenStorage, RefreshCoordinator, SessionStore,
    TokenStorage,
};
pub use config::Config;
pub use models::{Credentials, TokenPair, User};
