//! A named document and its per-instance encryption state.

use sealdrop_core::error::CryptoError;

use crate::engine::CryptoEngine;
use crate::keys::{generate_file_key, FileKey};
use crate::payload::{decrypt_payload, encrypt_payload};

/// One document's plaintext plus its lazily created file key.
///
/// The key is generated on first use and memoized on the instance, so
/// [`Document::encrypt`] and [`Document::wrapped_key_for`] always agree on
/// the same key, and two `Document` instances never share key state.
pub struct Document {
    name: String,
    contents: Vec<u8>,
    file_key: Option<FileKey>,
}

impl Document {
    /// Wrap plaintext that is about to be encrypted and uploaded.
    pub fn from_plaintext(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents,
            file_key: None,
        }
    }

    /// Reconstruct a document from its encrypted payload and the file key
    /// wrapped for this device.
    ///
    /// Failure usually means the key was wrapped for a different device
    /// keypair; callers surface that as a device-bound decryption error.
    pub fn from_encrypted(
        name: impl Into<String>,
        encrypted: &[u8],
        wrapped_key: &[u8],
        engine: &mut CryptoEngine,
    ) -> Result<Self, CryptoError> {
        let file_key = engine.unwrap_key_for_self(wrapped_key)?;
        let contents = decrypt_payload(encrypted, &file_key)?;

        Ok(Self {
            name: name.into(),
            contents,
            file_key: Some(file_key),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.contents
    }

    /// Encrypt the document's contents under its file key.
    ///
    /// The key is created on the first call and reused afterwards; each call
    /// still draws a fresh nonce, so repeated encryption is idempotent at
    /// the plaintext level but not at the byte level.
    pub fn encrypt(&mut self) -> Result<Vec<u8>, CryptoError> {
        let key = self.file_key.get_or_insert_with(generate_file_key);
        encrypt_payload(&self.contents, key)
    }

    /// Wrap this document's file key under a recipient's SPKI public key,
    /// creating the key first if it does not exist yet.
    pub fn wrapped_key_for(
        &mut self,
        engine: &CryptoEngine,
        recipient_spki: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.file_key.get_or_insert_with(generate_file_key);
        engine.wrap_key_for_recipient(key.as_bytes(), recipient_spki)
    }
}
