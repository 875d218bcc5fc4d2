use thiserror::Error;

use crate::types::{ChunkId, FileId};

/// Local durable key storage failed (unavailable or corrupt).
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key store file is corrupt: {0}")]
    Corrupt(String),
}

/// Authenticated decryption failed.
///
/// Deliberately opaque: an undersized payload, a corrupted ciphertext and a
/// wrong key are indistinguishable to the caller, so the error cannot be
/// used as a key-guessing oracle.
#[derive(Debug, Error)]
#[error("decryption failed: payload is corrupted or was encrypted under a different key")]
pub struct DecryptionError;

/// Cryptographic operation failed.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed key material: {0}")]
    BadKeyMaterial(String),

    #[error("keypair generation failed: {0}")]
    KeyGeneration(String),

    #[error("no device private key is available")]
    NoDeviceKey,

    #[error("key wrapping failed: {0}")]
    Wrap(String),

    /// Wrong device key and corrupted key blob are indistinguishable.
    #[error("key unwrapping failed: wrong device key or corrupted key blob")]
    Unwrap,

    #[error("payload encryption failed: {0}")]
    Encrypt(String),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
}

/// The backend rejected chunk 0 of an upload.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UploadProtocolError {
    #[error("file was never requested")]
    NotRequested,

    #[error("file was already fully uploaded")]
    AlreadyUploaded,
}

/// The backend rejected a share or revoke call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShareError {
    #[error("file is not fully uploaded yet")]
    Pending,

    #[error("caller does not own this file")]
    PermissionDenied,
}

/// Terminal failure of a transfer invocation.
///
/// Abort is not represented here: an aborted transfer is a distinct
/// non-error outcome reported through the controller's return value and
/// event stream.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("encrypted payload is {actual} bytes, exceeding the {limit}-byte limit")]
    SizeLimit { actual: u64, limit: u64 },

    #[error("upload rejected by the backend: {0}")]
    Protocol(#[from] UploadProtocolError),

    #[error("file {0} not found")]
    NotFound(FileId),

    #[error("file {0} is not fully uploaded yet")]
    NotReady(FileId),

    #[error("permission denied for file {0}")]
    PermissionDenied(FileId),

    #[error("chunk {chunk_id} of file {file_id} is missing on the backend")]
    ChunkMissing { file_id: FileId, chunk_id: ChunkId },

    #[error(
        "failed to decrypt \"{file_name}\": the key may belong to a different device, \
         try the device that created it"
    )]
    Decrypt {
        file_name: String,
        #[source]
        source: CryptoError,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("sharing rejected by the backend: {0}")]
    Share(#[from] ShareError),

    #[error("no file is registered under alias {0:?}")]
    UnknownAlias(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
