//! Durable persistence of the access/refresh token pair.
//!
//! The adapter API only moves complete pairs: a store writes both
//! tokens, a clear removes both. Nothing here can leave one token
//! behind without the other.

use std::path::PathBuf;

use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

use crate::models::TokenPair;

/// Token file name inside the storage directory
const TOKEN_FILE: &str = "tokens.json";

/// Keyring service name for the keychain-backed adapter
const SERVICE_NAME: &str = "authrelay";

/// Keyring entry holding the serialized token pair
const TOKEN_ENTRY: &str = "session-tokens";

/// Durable key/value persistence port for the session token pair.
pub trait TokenStorage: Send + Sync {
    /// Read the persisted pair, if any.
    fn load(&self) -> Result<Option<TokenPair>>;

    /// Persist both tokens as one logical operation.
    fn store(&self, pair: &TokenPair) -> Result<()>;

    /// Remove both tokens. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// JSON file under the cache directory, surviving process restarts.
pub struct FileTokenStorage {
    dir: PathBuf,
}

impl FileTokenStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<TokenPair>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read token file")?;
        let pair: TokenPair =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(pair))
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(pair)?;
        std::fs::write(self.token_path(), contents).context("Failed to write token file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// OS keychain storage via the keyring crate. The pair is serialized
/// into a single entry so store/clear stay one logical operation.
pub struct KeyringTokenStorage {
    service: String,
}

impl KeyringTokenStorage {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a distinct keyring service name, e.g. one per deployment.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_ENTRY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<TokenPair>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => {
                let pair = serde_json::from_str(&raw)
                    .context("Failed to parse keychain token entry")?;
                Ok(Some(pair))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read tokens from keychain"),
        }
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        let raw = serde_json::to_string(pair)?;
        self.entry()?
            .set_password(&raw)
            .context("Failed to store tokens in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete tokens from keychain"),
        }
    }
}

/// Process-local storage for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryTokenStorage {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TokenPair>> {
        // Poisoning cannot happen: no code panics while holding the lock.
        self.pair.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self.lock().clone())
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        *self.lock() = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
        }
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storage = FileTokenStorage::new(dir.path().to_path_buf());

        assert!(storage.load().unwrap().is_none());

        storage.store(&pair()).expect("store failed");
        assert_eq!(storage.load().unwrap(), Some(pair()));

        storage.clear().expect("clear failed");
        assert!(storage.load().unwrap().is_none());
        // clearing again is a no-op
        storage.clear().expect("second clear failed");
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").unwrap();

        let storage = FileTokenStorage::new(dir.path().to_path_buf());
        assert!(storage.load().is_err());
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryTokenStorage::new();
        assert!(storage.load().unwrap().is_none());
        storage.store(&pair()).unwrap();
        assert_eq!(storage.load().unwrap(), Some(pair()));
        storage.clear().unwrap();
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }
}
