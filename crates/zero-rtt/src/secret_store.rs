//! Abstraction over wherever the ticket store's encryption key actually
//! lives.
//!
//! A real browser build backs this with the OS-native secret store
//! (Keychain, DPAPI, the Secret Service); [`FileBackedSecretStore`] is the
//! dev/test implementation, writing the key to a file with restrictive
//! permissions rather than a platform keystore.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Error;

/// A place that can durably hold a small secret (the ticket store's
/// at-rest encryption key).
#[async_trait]
pub trait SecretStoreHandle: Send + Sync {
    /// Fetch the stored key, if one has been written yet.
    async fn load(&self) -> Result<Option<[u8; 32]>, Error>;

    /// Persist `key`, replacing any previous value.
    async fn store(&self, key: &[u8; 32]) -> Result<(), Error>;
}

/// Dev/test secret store backed by a plain file, written atomically via
/// a temp file + rename.
#[derive(Debug, Clone)]
pub struct FileBackedSecretStore {
    path: PathBuf,
}

impl FileBackedSecretStore {
    /// Store the key at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretStoreHandle for FileBackedSecretStore {
    async fn load(&self) -> Result<Option<[u8; 32]>, Error> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Persistence(err)),
        };
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Corrupt("secret store file is not 32 bytes".into()))?;
        Ok(Some(key))
    }

    async fn store(&self, key: &[u8; 32]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let parent = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let dir = parent.to_path_buf();
        let key = *key;
        let final_path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            use std::io::Write;
            tmp.write_all(&key)?;
            tmp.persist(&final_path).map_err(|err| Error::Persistence(err.error))?;
            Ok(())
        })
        .await
        .map_err(|err| Error::SecretStore(err.to_string()))??;
        Ok(())
    }
}
