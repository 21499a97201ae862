//! The encryption contract used by cloud sync.

use crate::cipher::{decrypt_string, encrypt_string};
use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;
use crate::keystore::KeyStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Key scope for personal (non-team) configs.
pub const DEFAULT_SCOPE: &str = "default";

/// Encrypts and decrypts cloud payloads.
///
/// Cloud operations call [`ensure_key`](Self::ensure_key) once up front and
/// pass the key to every `encrypt` / `decrypt`. Local sync never touches this.
pub trait EncryptionGateway: Send + Sync {
    /// Returns the key, creating and persisting one when allowed.
    ///
    /// Fails with `KeyUnavailable` when no key exists and creation is off.
    fn ensure_key(&self) -> CryptoResult<SecretKey>;

    fn encrypt(&self, plaintext: &str, key: &SecretKey) -> CryptoResult<String> {
        encrypt_string(key, plaintext)
    }

    /// Fails with `DecryptionFailed` on tampered or foreign payloads.
    fn decrypt(&self, cipher_text: &str, key: &SecretKey) -> CryptoResult<String> {
        decrypt_string(key, cipher_text)
    }
}

/// Gateway backed by a [`KeyStore`] on this device.
pub struct LocalKeyGateway {
    store: Arc<dyn KeyStore>,
    scope: String,
    allow_create: bool,
}

impl LocalKeyGateway {
    /// A gateway for `scope` that creates the key on first use.
    pub fn new(store: Arc<dyn KeyStore>, scope: impl Into<String>) -> Self {
        Self {
            store,
            scope: scope.into(),
            allow_create: true,
        }
    }

    /// Team keys are shared between members and must be imported instead.
    pub fn without_key_creation(mut self) -> Self {
        self.allow_create = false;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn has_key(&self) -> CryptoResult<bool> {
        Ok(self.store.load(&self.scope)?.is_some())
    }

    /// Stores a key received from another device (base64).
    pub fn import_key(&self, encoded: &str) -> CryptoResult<()> {
        let key = SecretKey::from_base64(encoded)?;
        self.store.store(&self.scope, &key)?;
        info!(scope = %self.scope, "imported encryption key");
        Ok(())
    }

    /// Returns the stored key as base64 for sharing with another device.
    pub fn export_key(&self) -> CryptoResult<String> {
        self.store
            .load(&self.scope)?
            .map(|k| k.to_base64())
            .ok_or_else(|| self.unavailable())
    }

    fn unavailable(&self) -> CryptoError {
        CryptoError::KeyUnavailable(format!("no key stored for scope '{}'", self.scope))
    }
}

impl EncryptionGateway for LocalKeyGateway {
    fn ensure_key(&self) -> CryptoResult<SecretKey> {
        if let Some(key) = self.store.load(&self.scope)? {
            return Ok(key);
        }
        if !self.allow_create {
            warn!(scope = %self.scope, "encryption key missing and creation disabled");
            return Err(self.unavailable());
        }
        let key = SecretKey::generate();
        self.store.store(&self.scope, &key)?;
        info!(scope = %self.scope, "generated new encryption key");
        Ok(key)
    }
}
