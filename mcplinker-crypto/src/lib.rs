//! Encryption layer for MCP Linker cloud backups.
//!
//! Server entries leave the machine only as opaque strings produced here:
//! - ChaCha20-Poly1305 with a fresh random nonce per message
//! - 32-byte keys, generated once per scope and kept in a local [`KeyStore`]
//! - wire form is `base64(nonce || ciphertext || tag)`
//!
//! Callers go through the [`EncryptionGateway`] trait so the cloud engine can
//! be exercised with any key source.

mod cipher;
mod error;
mod gateway;
mod key;
mod keystore;

pub use cipher::{NONCE_SIZE, TAG_SIZE, decrypt_string, encrypt_string};
pub use error::{CryptoError, CryptoResult};
pub use gateway::{DEFAULT_SCOPE, EncryptionGateway, LocalKeyGateway};
pub use key::{KEY_SIZE, SecretKey};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
