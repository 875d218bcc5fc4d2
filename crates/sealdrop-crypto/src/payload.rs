//! Whole-payload AES-256-GCM encryption/decryption
//!
//! Encrypted payload format (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! This layout is the one bit-exact wire contract of the system: any two
//! conforming clients must interoperate on it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sealdrop_core::error::{CryptoError, DecryptionError};

use crate::keys::FileKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Encrypt a payload with AES-256-GCM under a fresh random nonce.
///
/// Returns `[12-byte nonce][ciphertext][16-byte tag]`. The nonce is never
/// reused for a given key: every call draws new randomness.
pub fn encrypt_payload(plaintext: &[u8], key: &FileKey) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encrypt(format!("payload encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a payload produced by [`encrypt_payload`].
///
/// Undersized input and authentication failure yield the same opaque
/// [`DecryptionError`]; callers cannot tell the two apart.
pub fn decrypt_payload(encrypted: &[u8], key: &FileKey) -> Result<Vec<u8>, DecryptionError> {
    if encrypted.len() < NONCE_SIZE + TAG_SIZE {
        return Err(DecryptionError);
    }

    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher.decrypt(nonce, ciphertext).map_err(|_| DecryptionError)
}
