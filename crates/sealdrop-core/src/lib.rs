//! sealdrop-core: shared types, config schema, and error taxonomy for the
//! sealdrop end-to-end encrypted document client.

pub mod config;
pub mod error;
pub mod types;

pub use error::{
    CryptoError, DecryptionError, KeyStoreError, ShareError, TransferError, UploadProtocolError,
};
pub use types::{AliasInfo, ChunkId, FileId, FileRecord, FileStatus, PublicUser};
