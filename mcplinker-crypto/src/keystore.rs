//! Where encryption keys live between runs.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Persistent key storage, one key per scope.
///
/// A scope is `"default"` for the personal key or a team id.
pub trait KeyStore: Send + Sync {
    fn load(&self, scope: &str) -> CryptoResult<Option<SecretKey>>;
    fn store(&self, scope: &str, key: &SecretKey) -> CryptoResult<()>;
    fn remove(&self, scope: &str) -> CryptoResult<()>;
}

/// Keys kept as base64 files named `encryption_key_<scope>` in one directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, scope: &str) -> CryptoResult<PathBuf> {
        validate_scope(scope)?;
        Ok(self.dir.join(format!("encryption_key_{scope}")))
    }
}

fn validate_scope(scope: &str) -> CryptoResult<()> {
    let ok = !scope.is_empty()
        && scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(CryptoError::KeyStore(format!("invalid key scope '{scope}'")))
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self, scope: &str) -> CryptoResult<Option<SecretKey>> {
        let path = self.path_for(scope)?;
        match fs::read_to_string(&path) {
            Ok(encoded) => SecretKey::from_base64(&encoded).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, scope: &str, key: &SecretKey) -> CryptoResult<()> {
        let path = self.path_for(scope)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, key.to_base64())?;
        restrict_permissions(&path)?;
        debug!(scope, path = %path.display(), "stored encryption key");
        Ok(())
    }

    fn remove(&self, scope: &str) -> CryptoResult<()> {
        let path = self.path_for(scope)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> CryptoResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> CryptoResult<()> {
    Ok(())
}

/// In-process key storage.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, SecretKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, scope: &str) -> CryptoResult<Option<SecretKey>> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| CryptoError::KeyStore("key map poisoned".into()))?;
        Ok(keys.get(scope).cloned())
    }

    fn store(&self, scope: &str, key: &SecretKey) -> CryptoResult<()> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| CryptoError::KeyStore("key map poisoned".into()))?;
        keys.insert(scope.to_string(), key.clone());
        Ok(())
    }

    fn remove(&self, scope: &str) -> CryptoResult<()> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| CryptoError::KeyStore("key map poisoned".into()))?;
        keys.remove(scope);
        Ok(())
    }
}
