//! Durable token storage.
//!
//! Stores the access/refresh pair in `<HUDDLE_HOME>/tokens.json` with
//! restricted permissions (0600). Tokens are never logged in full.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use huddle_types::TokenPair;
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Persistence for the session's token pair.
pub trait TokenStore: Send + Sync {
    /// Returns the persisted pair, or empty strings if nothing is stored.
    fn load(&self) -> Result<TokenPair>;

    /// Replaces both persisted tokens. Either both land or neither does.
    fn save(&self, pair: &TokenPair) -> Result<()>;

    /// Removes both persisted tokens.
    fn clear(&self) -> Result<()>;
}

/// On-disk layout; key names match the browser storage keys of the web client.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

/// JSON file token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under `HUDDLE_HOME`.
    pub fn default_location() -> Self {
        Self::new(paths::tokens_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<TokenPair> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(TokenPair::default()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read tokens from {}", self.path.display())
                });
            }
        };

        let stored: StoredTokens = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse tokens from {}", self.path.display()))?;

        Ok(TokenPair::new(stored.access_token, stored.refresh_token))
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        let stored = StoredTokens {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        };
        let contents =
            serde_json::to_string_pretty(&stored).context("Failed to serialize tokens")?;

        // NamedTempFile is created 0600 on unix; persist() renames over the old file.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(contents.as_bytes())
            .context("Failed to write tokens to temp file")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to flush tokens to disk")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to move tokens into {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "saved token pair");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "cleared token pair");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// In-process store, used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: Mutex::new(pair),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<TokenPair> {
        Ok(self
            .pair
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = pair.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = TokenPair::default();
        Ok(())
    }
}

/// Returns a masked version of a token for display (first 8 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 12 || !token.is_char_boundary(8) {
        return "***".to_string();
    }
    format!("{}...", &token[..8])
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_loads_empty_pair() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        let pair = store.load().unwrap();
        assert!(pair.is_empty());
    }

    #[test]
    fn test_save_then_load_returns_same_pair() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("tokens.json"));
        let pair = TokenPair::new("access-1", "refresh-1");

        store.save(&pair).unwrap();

        assert_eq!(store.load().unwrap(), pair);
    }

    #[test]
    fn test_save_replaces_previous_pair() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));

        store.save(&TokenPair::new("old-a", "old-r")).unwrap();
        store.save(&TokenPair::new("new-a", "new-r")).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(!contents.contains("old-"));
        assert_eq!(store.load().unwrap(), TokenPair::new("new-a", "new-r"));
    }

    #[test]
    fn test_file_uses_browser_storage_key_names() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.save(&TokenPair::new("a", "r")).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json["access_token"], "a");
        assert_eq!(json["refresh_token"], "r");
    }

    #[test]
    fn test_clear_removes_file_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.save(&TokenPair::new("a", "r")).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_partial_file_loads_missing_key_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"access_token": "only-access"}"#).unwrap();

        let pair = FileTokenStore::new(&path).load().unwrap();
        assert_eq!(pair.access_token, "only-access");
        assert_eq!(pair.refresh_token, "");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();

        assert!(FileTokenStore::new(&path).load().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens.json"));
        store.save(&TokenPair::new("a", "r")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store_round_trip_and_clear() {
        let store = MemoryTokenStore::new();
        store.save(&TokenPair::new("a", "r")).unwrap();
        assert_eq!(store.load().unwrap(), TokenPair::new("a", "r"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci...");
    }
}
