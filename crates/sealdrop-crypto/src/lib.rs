//! sealdrop-crypto: client-side E2E encryption for sealdrop
//!
//! Architecture: Encrypt-then-Chunk with AES-256-GCM
//!
//! Pipeline: plaintext → AES-256-GCM encrypt (whole payload) → fixed-size chunk → upload
//!
//! Key hierarchy:
//! ```text
//! Device Keypair (RSA-OAEP, 4096-bit, SHA-256; persisted in the key store, never synced)
//!   └── File Key (per-document, 256-bit random, held in memory only)
//!         ├── Payload AEAD: AES-256-GCM (nonce=random_96bit, layout: nonce || ciphertext+tag)
//!         └── Wrapped per recipient: RSA-OAEP under that recipient's public key
//! ```
//!
//! Sharing re-wraps the file key under another device's public key; the file
//! bytes are never re-encrypted.

pub mod document;
pub mod engine;
pub mod keys;
pub mod payload;

pub use document::Document;
pub use engine::CryptoEngine;
pub use keys::{generate_file_key, FileKey};
pub use payload::{decrypt_payload, encrypt_payload};

/// Size of a file key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
