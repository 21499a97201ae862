//! ChaCha20-Poly1305 over strings.

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 tag in bytes.
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &SecretKey) -> CryptoResult<ChaCha20Poly1305> {
    ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))
}

/// Encrypts `plaintext` and returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_string(key: &SecretKey, plaintext: &str) -> CryptoResult<String> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(STANDARD.encode(out))
}

/// Reverses [`encrypt_string`].
///
/// Every failure mode (bad base64, truncated input, wrong key, tampering,
/// non-UTF-8 plaintext) is reported as `DecryptionFailed`.
pub fn decrypt_string(key: &SecretKey, encoded: &str) -> CryptoResult<String> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("payload is not base64: {e}")))?;

    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::DecryptionFailed(format!(
            "payload too short: {} bytes",
            raw.len()
        )));
    }

    let (nonce, sealed) = raw.split_at(NONCE_SIZE);
    let plain = cipher_for(key)?
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::DecryptionFailed("wrong key or tampered data".into()))?;

    String::from_utf8(plain)
        .map_err(|_| CryptoError::DecryptionFailed("plaintext is not UTF-8".into()))
}
