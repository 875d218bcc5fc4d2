use serde::{Deserialize, Serialize};

/// Backend-assigned file identifier (auto-incrementing).
pub type FileId = u64;

/// Zero-based index of a chunk within a file's encrypted payload.
pub type ChunkId = u64;

/// A registered user of the document service, as the backend exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub username: String,
    /// Device public key in SPKI DER encoding.
    pub public_key: Vec<u8>,
}

/// Lifecycle status of a file record on the backend.
///
/// A record starts `Pending` (created by a document request), moves to
/// `PartiallyUploaded` once chunk 0 lands, and becomes `Uploaded` when the
/// backend has acknowledged every chunk. Uploaded records are immutable
/// except for their shared-recipients list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    /// Requested but no content uploaded yet. The alias is the shareable
    /// request link handed to whoever will provide the document.
    Pending { alias: String, requested_at: u64 },
    /// Chunk 0 (and possibly more) received, but not all chunks yet.
    PartiallyUploaded,
    /// All chunks acknowledged.
    Uploaded { uploaded_at: u64 },
}

/// Client-side view of one backend file record (owned or shared).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: FileId,
    pub file_name: String,
    pub status: FileStatus,
    /// Users this file has been shared with.
    pub shared_with: Vec<PublicUser>,
}

impl FileRecord {
    /// Whether every chunk has been acknowledged by the backend.
    pub fn is_uploaded(&self) -> bool {
        matches!(self.status, FileStatus::Uploaded { .. })
    }
}

/// Resolution of a request alias: which file the alias points at and whose
/// public key the uploaded document key must be wrapped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasInfo {
    pub file_id: FileId,
    pub file_name: String,
    pub user: PublicUser,
}
