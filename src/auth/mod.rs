//! Authentication module for managing the user session and its tokens.
//!
//! This module provides:
//! - `SessionStore`: process-wide session state with an injectable
//!   durable-storage port
//! - `RefreshCoordinator`: single-flight token refresh
//! - `TokenStorage` adapters: file, OS keychain, and in-memory
//!
//! Tokens are persisted as a pair and removed as a pair.

pub mod refresh;
pub mod session;
pub mod storage;

pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use session::SessionStore;
pub use storage::{FileTokenStorage, KeyringTokenStorage, MemoryTokenStorage, TokenStorage};
