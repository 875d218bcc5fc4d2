//! In-memory reference backend.
//!
//! Implements the full [`FileStore`] contract against process-local state:
//! status transitions (pending → partially-uploaded → uploaded on the last
//! chunk), per-caller permission checks, and shared-key substitution on
//! shared downloads. Integration tests and local development run against
//! this the way a deployment runs against the real service.
//!
//! Handles are cheap clones over shared state; [`InMemoryFileStore::connect_as`]
//! models a different user's authenticated channel to the same backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::error::{ShareError, TransferError, UploadProtocolError};
use sealdrop_core::{AliasInfo, ChunkId, FileId, FileRecord, FileStatus, PublicUser};

use crate::api::{
    FileData, FileDownloadResponse, FileStore, UploadFileAtomicRequest, UploadFileRequest,
};

#[derive(Debug)]
struct StoredContent {
    num_chunks: u64,
    file_type: String,
    owner_key: Vec<u8>,
    /// Per-recipient wrapped keys, by username.
    shared_keys: BTreeMap<String, Vec<u8>>,
    /// True once every chunk has arrived.
    complete: bool,
}

#[derive(Debug)]
enum Content {
    Pending { alias: String },
    Stored(StoredContent),
}

#[derive(Debug)]
struct StoredFile {
    file_name: String,
    requester: String,
    requested_at: u64,
    uploaded_at: Option<u64>,
    content: Content,
}

#[derive(Debug, Default)]
struct State {
    file_count: u64,
    alias_count: u64,
    /// username → SPKI public key
    users: BTreeMap<String, Vec<u8>>,
    files: BTreeMap<FileId, StoredFile>,
    chunks: BTreeMap<(FileId, ChunkId), Bytes>,
    aliases: BTreeMap<String, FileId>,
    owners: BTreeMap<String, Vec<FileId>>,
    shares: BTreeMap<String, Vec<FileId>>,
}

impl State {
    fn next_file_id(&mut self) -> FileId {
        let id = self.file_count;
        self.file_count += 1;
        id
    }

    fn num_chunks_uploaded(&self, file_id: FileId) -> u64 {
        self.chunks
            .range((file_id, 0)..=(file_id, ChunkId::MAX))
            .count() as u64
    }

    fn is_visible_to(&self, file_id: FileId, caller: &str) -> bool {
        let owned = self
            .owners
            .get(caller)
            .map_or(false, |ids| ids.contains(&file_id));
        let shared = self
            .shares
            .get(caller)
            .map_or(false, |ids| ids.contains(&file_id));
        owned || shared
    }

    fn public_user(&self, username: &str) -> PublicUser {
        PublicUser {
            username: username.to_string(),
            public_key: self.users.get(username).cloned().unwrap_or_default(),
        }
    }

    fn record_for(&self, file_id: FileId, file: &StoredFile) -> FileRecord {
        let (status, shared_with) = match &file.content {
            Content::Pending { alias } => (
                FileStatus::Pending {
                    alias: alias.clone(),
                    requested_at: file.requested_at,
                },
                Vec::new(),
            ),
            Content::Stored(stored) => {
                let shared_with = stored
                    .shared_keys
                    .keys()
                    .map(|name| self.public_user(name))
                    .collect();
                let status = if stored.complete {
                    FileStatus::Uploaded {
                        uploaded_at: file.uploaded_at.unwrap_or_default(),
                    }
                } else {
                    FileStatus::PartiallyUploaded
                };
                (status, shared_with)
            }
        };

        FileRecord {
            file_id,
            file_name: file.file_name.clone(),
            status,
            shared_with,
        }
    }
}

fn get_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Process-local backend; see module docs.
#[derive(Debug, Clone)]
pub struct InMemoryFileStore {
    state: Arc<Mutex<State>>,
    caller: String,
}

impl InMemoryFileStore {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            caller: caller.into(),
        }
    }

    /// A handle to the same backend authenticated as a different user.
    pub fn connect_as(&self, username: impl Into<String>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            caller: username.into(),
        }
    }

    /// Register a user and their device public key (onboarding is out of
    /// band for the transfer engine, so it lives on the impl, not the trait).
    pub fn register_user(&self, username: impl Into<String>, public_key: Vec<u8>) {
        self.lock().users.insert(username.into(), public_key);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("state lock poisoned")
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn upload_file_atomic(
        &self,
        request: UploadFileAtomicRequest,
    ) -> Result<FileId, TransferError> {
        let mut state = self.lock();
        let file_id = state.next_file_id();
        let now = get_time();

        state.chunks.insert((file_id, 0), request.content);
        state.files.insert(
            file_id,
            StoredFile {
                file_name: request.name,
                requester: self.caller.clone(),
                requested_at: now,
                uploaded_at: Some(now),
                content: Content::Stored(StoredContent {
                    num_chunks: request.num_chunks,
                    file_type: request.file_type,
                    owner_key: request.owner_key,
                    shared_keys: BTreeMap::new(),
                    complete: request.num_chunks == 1,
                }),
            },
        );
        state
            .owners
            .entry(self.caller.clone())
            .or_default()
            .push(file_id);

        Ok(file_id)
    }

    async fn upload_file(&self, request: UploadFileRequest) -> Result<(), TransferError> {
        let mut state = self.lock();
        let file_id = request.file_id;

        let file = state
            .files
            .get_mut(&file_id)
            .ok_or(TransferError::Protocol(UploadProtocolError::NotRequested))?;

        let alias = match &file.content {
            Content::Pending { alias } => alias.clone(),
            Content::Stored(_) => {
                return Err(TransferError::Protocol(UploadProtocolError::AlreadyUploaded))
            }
        };

        file.content = Content::Stored(StoredContent {
            num_chunks: request.num_chunks,
            file_type: request.file_type,
            owner_key: request.owner_key,
            shared_keys: BTreeMap::new(),
            complete: request.num_chunks == 1,
        });
        file.uploaded_at = Some(get_time());

        state.chunks.insert((file_id, 0), request.file_content);
        state.aliases.remove(&alias);
        Ok(())
    }

    async fn upload_file_continue(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
        contents: Bytes,
    ) -> Result<(), TransferError> {
        let mut state = self.lock();

        let num_chunks = {
            let file = state
                .files
                .get(&file_id)
                .ok_or_else(|| anyhow::anyhow!("file {file_id} doesn't exist"))?;
            match &file.content {
                Content::Stored(stored) if !stored.complete => stored.num_chunks,
                _ => {
                    return Err(TransferError::Backend(anyhow::anyhow!(
                        "file {file_id} is not accepting chunks"
                    )))
                }
            }
        };

        if chunk_id >= num_chunks {
            return Err(TransferError::Backend(anyhow::anyhow!(
                "invalid chunk id {chunk_id} (file has {num_chunks} chunks)"
            )));
        }
        if state.chunks.contains_key(&(file_id, chunk_id)) {
            return Err(TransferError::Backend(anyhow::anyhow!(
                "chunk {chunk_id} already uploaded"
            )));
        }

        state.chunks.insert((file_id, chunk_id), contents);

        if state.num_chunks_uploaded(file_id) == num_chunks {
            if let Some(StoredFile {
                content: Content::Stored(stored),
                ..
            }) = state.files.get_mut(&file_id)
            {
                stored.complete = true;
            }
        }
        Ok(())
    }

    async fn download_chunk(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
    ) -> Result<FileDownloadResponse, TransferError> {
        let state = self.lock();

        if !state.is_visible_to(file_id, &self.caller) {
            return Ok(FileDownloadResponse::PermissionError);
        }

        let Some(file) = state.files.get(&file_id) else {
            return Ok(FileDownloadResponse::NotFoundFile);
        };

        let stored = match &file.content {
            Content::Stored(stored) if stored.complete => stored,
            _ => return Ok(FileDownloadResponse::NotUploadedFile),
        };

        let is_owner = state
            .owners
            .get(&self.caller)
            .map_or(false, |ids| ids.contains(&file_id));
        let owner_key = if is_owner {
            stored.owner_key.clone()
        } else {
            match stored.shared_keys.get(&self.caller) {
                Some(key) => key.clone(),
                None => return Ok(FileDownloadResponse::PermissionError),
            }
        };

        let Some(contents) = state.chunks.get(&(file_id, chunk_id)) else {
            return Ok(FileDownloadResponse::NotFoundFile);
        };

        Ok(FileDownloadResponse::FoundFile(FileData {
            contents: contents.clone(),
            file_type: stored.file_type.clone(),
            owner_key,
            num_chunks: stored.num_chunks,
        }))
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, TransferError> {
        let state = self.lock();

        let owned = state.owners.get(&self.caller).cloned().unwrap_or_default();
        let shared = state.shares.get(&self.caller).cloned().unwrap_or_default();

        let mut records = Vec::new();
        for file_id in owned.into_iter().chain(shared) {
            if let Some(file) = state.files.get(&file_id) {
                records.push(state.record_for(file_id, file));
            }
        }
        Ok(records)
    }

    async fn request_file(&self, name: &str) -> Result<String, TransferError> {
        let mut state = self.lock();

        let alias = format!("req-{:06}", state.alias_count);
        state.alias_count += 1;

        let file_id = state.next_file_id();
        state.files.insert(
            file_id,
            StoredFile {
                file_name: name.to_string(),
                requester: self.caller.clone(),
                requested_at: get_time(),
                uploaded_at: None,
                content: Content::Pending {
                    alias: alias.clone(),
                },
            },
        );
        state.aliases.insert(alias.clone(), file_id);
        state
            .owners
            .entry(self.caller.clone())
            .or_default()
            .push(file_id);

        Ok(alias)
    }

    async fn alias_info(&self, alias: &str) -> Result<AliasInfo, TransferError> {
        let state = self.lock();

        let file_id = *state
            .aliases
            .get(alias)
            .ok_or_else(|| TransferError::UnknownAlias(alias.to_string()))?;
        let file = state
            .files
            .get(&file_id)
            .ok_or(TransferError::NotFound(file_id))?;

        Ok(AliasInfo {
            file_id,
            file_name: file.file_name.clone(),
            user: state.public_user(&file.requester),
        })
    }

    async fn share_file(
        &self,
        file_id: FileId,
        recipient: &str,
        wrapped_key: Vec<u8>,
    ) -> Result<(), TransferError> {
        let mut state = self.lock();

        let owns = state
            .owners
            .get(&self.caller)
            .map_or(false, |ids| ids.contains(&file_id));
        if !owns {
            return Err(TransferError::Share(ShareError::PermissionDenied));
        }

        let file = state
            .files
            .get_mut(&file_id)
            .ok_or(TransferError::NotFound(file_id))?;
        match &mut file.content {
            Content::Stored(stored) if stored.complete => {
                stored.shared_keys.insert(recipient.to_string(), wrapped_key);
            }
            _ => return Err(TransferError::Share(ShareError::Pending)),
        }

        let shares = state.shares.entry(recipient.to_string()).or_default();
        if !shares.contains(&file_id) {
            shares.push(file_id);
        }
        Ok(())
    }

    async fn revoke_share(&self, file_id: FileId, recipient: &str) -> Result<(), TransferError> {
        let mut state = self.lock();

        let owns = state
            .owners
            .get(&self.caller)
            .map_or(false, |ids| ids.contains(&file_id));
        if !owns {
            return Err(TransferError::Share(ShareError::PermissionDenied));
        }

        match state.shares.get_mut(recipient) {
            None => return Err(TransferError::Share(ShareError::PermissionDenied)),
            Some(ids) => ids.retain(|&id| id != file_id),
        }
        if let Some(StoredFile {
            content: Content::Stored(stored),
            ..
        }) = state.files.get_mut(&file_id)
        {
            stored.shared_keys.remove(recipient);
        }
        Ok(())
    }

    async fn get_users(&self) -> Result<Vec<PublicUser>, TransferError> {
        let state = self.lock();
        Ok(state
            .users
            .keys()
            .map(|name| state.public_user(name))
            .collect())
    }
}
