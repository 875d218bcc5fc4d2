//! Typed surface of the remote backend.
//!
//! The backend itself (metadata, access control, chunked blob storage) is an
//! external collaborator reached over one authenticated channel; this module
//! defines the client-side contract the transfer engine depends on. Caller
//! identity is a property of the channel, not of individual calls.

use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::error::TransferError;
use sealdrop_core::{AliasInfo, ChunkId, FileId, FileRecord, PublicUser};

/// Chunk 0 of a brand-new self-upload. Creates the file record and returns
/// its backend-assigned id.
#[derive(Debug, Clone)]
pub struct UploadFileAtomicRequest {
    pub name: String,
    pub content: Bytes,
    /// File key wrapped under the uploader's own public key.
    pub owner_key: Vec<u8>,
    pub file_type: String,
    pub num_chunks: u64,
}

/// Chunk 0 of an upload fulfilling an existing request (resolved via its
/// alias). Advances the record from pending to partially-uploaded.
#[derive(Debug, Clone)]
pub struct UploadFileRequest {
    pub file_id: FileId,
    pub file_content: Bytes,
    /// File key wrapped under the requester's public key.
    pub owner_key: Vec<u8>,
    pub file_type: String,
    pub num_chunks: u64,
}

/// One chunk of a fully uploaded file, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub contents: Bytes,
    pub file_type: String,
    /// File key wrapped for the caller (owner key or per-recipient share key,
    /// whichever applies to the authenticated channel).
    pub owner_key: Vec<u8>,
    pub num_chunks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDownloadResponse {
    FoundFile(FileData),
    NotFoundFile,
    NotUploadedFile,
    PermissionError,
}

impl FileDownloadResponse {
    /// Collapse the response into the chunk payload, mapping each miss onto
    /// the transfer error taxonomy.
    pub fn into_found(self, file_id: FileId, chunk_id: ChunkId) -> Result<FileData, TransferError> {
        match self {
            FileDownloadResponse::FoundFile(data) => Ok(data),
            FileDownloadResponse::NotFoundFile => {
                if chunk_id == 0 {
                    Err(TransferError::NotFound(file_id))
                } else {
                    Err(TransferError::ChunkMissing { file_id, chunk_id })
                }
            }
            FileDownloadResponse::NotUploadedFile => Err(TransferError::NotReady(file_id)),
            FileDownloadResponse::PermissionError => Err(TransferError::PermissionDenied(file_id)),
        }
    }
}

/// The remote procedure surface consumed by the transfer engine.
///
/// Chunk indices live in `[0, num_chunks)`; the backend tolerates
/// out-of-order arrival of bulk chunks, and `upload_file_continue` is keyed
/// by `(file_id, chunk_id)`.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Create a new self-owned file with chunk 0 of its content.
    async fn upload_file_atomic(
        &self,
        request: UploadFileAtomicRequest,
    ) -> Result<FileId, TransferError>;

    /// Upload chunk 0 for a previously requested file. Fails with
    /// [`sealdrop_core::error::UploadProtocolError`] (wrapped in
    /// [`TransferError::Protocol`]) when the file was never requested or is
    /// already fully uploaded.
    async fn upload_file(&self, request: UploadFileRequest) -> Result<(), TransferError>;

    /// Upload one bulk chunk (`chunk_id >= 1`).
    async fn upload_file_continue(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
        contents: Bytes,
    ) -> Result<(), TransferError>;

    /// Fetch one chunk of a fully uploaded file.
    async fn download_chunk(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
    ) -> Result<FileDownloadResponse, TransferError>;

    /// All files visible to the caller: owned requests plus files shared
    /// with them.
    async fn list_files(&self) -> Result<Vec<FileRecord>, TransferError>;

    /// Create a pending file record and return its request alias.
    async fn request_file(&self, name: &str) -> Result<String, TransferError>;

    /// Resolve a request alias to the pending file and the requester's
    /// public key.
    async fn alias_info(&self, alias: &str) -> Result<AliasInfo, TransferError>;

    /// Grant `recipient` access to a fully uploaded file; `wrapped_key` is
    /// the file key re-wrapped under the recipient's public key.
    async fn share_file(
        &self,
        file_id: FileId,
        recipient: &str,
        wrapped_key: Vec<u8>,
    ) -> Result<(), TransferError>;

    /// Withdraw a previously granted share.
    async fn revoke_share(&self, file_id: FileId, recipient: &str) -> Result<(), TransferError>;

    /// All registered users (used to pick share recipients).
    async fn get_users(&self) -> Result<Vec<PublicUser>, TransferError>;
}
