//! Download controller: sequential chunk fetch, in-order reassembly,
//! decryption.
//!
//! Chunks are fetched one at a time (simpler backpressure; they must be
//! concatenated in index order anyway). The abort flag is checked before
//! each fetch, and an observed abort yields an `Aborted` outcome rather
//! than an error.

use std::sync::Arc;

use sealdrop_core::error::TransferError;
use sealdrop_core::{ChunkId, FileId, FileStatus};
use sealdrop_crypto::{CryptoEngine, Document};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{FileData, FileStore};
use crate::events::{TransferEvent, TransferEvents};

/// A fully downloaded, decrypted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub name: String,
    pub content_type: String,
    pub uploaded_at: u64,
    pub contents: Vec<u8>,
}

/// Non-error terminal outcome of a download invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(DownloadedFile),
    Aborted,
}

/// One download transfer. Owns its own abort token and event channel.
pub struct Downloader<S: FileStore> {
    store: Arc<S>,
    events: TransferEvents,
    cancel: CancellationToken,
}

impl<S: FileStore> Downloader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_abort_token(store, CancellationToken::new())
    }

    /// Tie this transfer to an externally owned cancellation token.
    pub fn with_abort_token(store: Arc<S>, cancel: CancellationToken) -> Self {
        Self {
            store,
            events: TransferEvents::default(),
            cancel,
        }
    }

    pub fn events(&self) -> &TransferEvents {
        &self.events
    }

    /// Request cooperative cancellation. Idempotent.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch, reassemble and decrypt the file with id `file_id`.
    ///
    /// Emits exactly one terminal event per invocation.
    pub async fn download(
        &self,
        engine: &mut CryptoEngine,
        file_id: FileId,
    ) -> Result<DownloadOutcome, TransferError> {
        match self.run_download(engine, file_id).await {
            Ok(DownloadOutcome::Completed(file)) => {
                info!(file_id, bytes = file.contents.len(), "download complete");
                self.events.emit(TransferEvent::Completed { file_id });
                Ok(DownloadOutcome::Completed(file))
            }
            Ok(DownloadOutcome::Aborted) => {
                debug!(file_id, "download aborted");
                self.events.emit(TransferEvent::Aborted);
                Ok(DownloadOutcome::Aborted)
            }
            Err(err) => {
                warn!(file_id, error = %err, "download failed");
                self.events.emit(TransferEvent::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_download(
        &self,
        engine: &mut CryptoEngine,
        file_id: FileId,
    ) -> Result<DownloadOutcome, TransferError> {
        self.events.emit(TransferEvent::DownloadStarted);

        // Resolve the record among the caller's accessible files.
        let records = self.store.list_files().await?;
        if self.cancel.is_cancelled() {
            return Ok(DownloadOutcome::Aborted);
        }

        let record = records
            .into_iter()
            .find(|r| r.file_id == file_id)
            .ok_or(TransferError::NotFound(file_id))?;

        let uploaded_at = match record.status {
            FileStatus::Uploaded { uploaded_at } => uploaded_at,
            FileStatus::Pending { .. } | FileStatus::PartiallyUploaded => {
                return Err(TransferError::NotReady(file_id))
            }
        };

        // Chunk 0 carries the wrapped key, the content type and the total
        // chunk count.
        let first = self.fetch_chunk(file_id, 0).await?;
        if self.cancel.is_cancelled() {
            return Ok(DownloadOutcome::Aborted);
        }

        let total = first.num_chunks;
        debug!(file_id, chunks = total, "downloading");

        let mut assembled = Vec::from(&first.contents[..]);
        self.events
            .emit(TransferEvent::ChunkDownloaded { current: 1, total });

        for chunk_id in 1..total {
            if self.cancel.is_cancelled() {
                debug!(file_id, chunk_id, "download stopped before chunk fetch");
                return Ok(DownloadOutcome::Aborted);
            }

            let chunk = self.fetch_chunk(file_id, chunk_id).await?;
            assembled.extend_from_slice(&chunk.contents);
            self.events.emit(TransferEvent::ChunkDownloaded {
                current: chunk_id + 1,
                total,
            });
        }

        self.events.emit(TransferEvent::Decrypting);

        // Decryption failure names the file: the wrapped key is device-bound
        // and the most common cause is a different device's keypair.
        let document =
            Document::from_encrypted(&record.file_name, &assembled, &first.owner_key, engine)
                .map_err(|source| TransferError::Decrypt {
                    file_name: record.file_name.clone(),
                    source,
                })?;

        Ok(DownloadOutcome::Completed(DownloadedFile {
            name: record.file_name,
            content_type: first.file_type,
            uploaded_at,
            contents: document.into_contents(),
        }))
    }

    async fn fetch_chunk(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
    ) -> Result<FileData, TransferError> {
        self.store
            .download_chunk(file_id, chunk_id)
            .await?
            .into_found(file_id, chunk_id)
    }
}
