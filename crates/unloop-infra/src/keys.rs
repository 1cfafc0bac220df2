//! API key resolution for the Gemini backend.
//!
//! Keys are resolved through a fixed chain: the `GEMINI_API_KEY`
//! environment variable, then `GOOGLE_API_KEY`, then a key file under the
//! data directory. The key selection flow writes to the key file, which
//! is the only writable link in the chain.
//!
//! Keys are returned as [`SecretString`] and never logged.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tokio::fs;

use unloop_types::error::StoreError;

const KEY_FILE: &str = "api_key";
const ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Resolves, stores, and clears the API key.
pub struct KeyChain {
    key_path: PathBuf,
}

impl KeyChain {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            key_path: data_dir.join(KEY_FILE),
        }
    }

    /// Walk the chain and return the first usable key.
    pub async fn resolve(&self) -> Option<SecretString> {
        for var in ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    tracing::debug!(source = var, "API key resolved from environment");
                    return Some(SecretString::from(value.to_string()));
                }
            }
        }

        match fs::read_to_string(&self.key_path).await {
            Ok(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    None
                } else {
                    tracing::debug!("API key resolved from key file");
                    Some(SecretString::from(raw.to_string()))
                }
            }
            Err(_) => None,
        }
    }

    /// Whether any link in the chain yields a key.
    pub async fn has_key(&self) -> bool {
        self.resolve().await.is_some()
    }

    /// Persist a key to the key file, creating the data directory if
    /// needed. Owner-only permissions on unix.
    pub async fn store(&self, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::Conflict("cannot store an empty key".to_string()));
        }
        if let Some(parent) = self.key_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        fs::write(&self.key_path, key)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.key_path, perms)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        Ok(())
    }

    /// Remove the stored key file. Missing file is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.key_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    // Env-var links are not covered here: tests run in parallel and the
    // process environment is shared. The file link is the writable one
    // and is what the key selection flow exercises.

    #[tokio::test]
    async fn test_empty_chain_resolves_nothing() {
        let tmp = TempDir::new().unwrap();
        let chain = KeyChain::new(tmp.path());
        if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("GOOGLE_API_KEY").is_ok() {
            return; // environment already carries a key; skip
        }
        assert!(!chain.has_key().await);
    }

    #[tokio::test]
    async fn test_store_then_resolve_from_file() {
        let tmp = TempDir::new().unwrap();
        let chain = KeyChain::new(tmp.path());
        chain.store("  test-key-not-real  ").await.unwrap();

        let key = fs::read_to_string(tmp.path().join(KEY_FILE)).await.unwrap();
        assert_eq!(key, "test-key-not-real");

        if std::env::var("GEMINI_API_KEY").is_err() && std::env::var("GOOGLE_API_KEY").is_err() {
            let resolved = chain.resolve().await.unwrap();
            assert_eq!(resolved.expose_secret(), "test-key-not-real");
        }
    }

    #[tokio::test]
    async fn test_store_rejects_empty_key() {
        let tmp = TempDir::new().unwrap();
        let chain = KeyChain::new(tmp.path());
        assert!(chain.store("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let chain = KeyChain::new(tmp.path());
        chain.clear().await.unwrap();
        chain.store("test-key").await.unwrap();
        chain.clear().await.unwrap();
        chain.clear().await.unwrap();
        assert!(!tmp.path().join(KEY_FILE).exists());
    }
}
