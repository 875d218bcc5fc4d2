//! Shared test support: an instrumented [`FileStore`] wrapper that counts
//! calls, tracks chunk-upload concurrency, and can trip a cancellation
//! token at chosen points to exercise abort races deterministically.

// Each test target uses a different subset of this module.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::error::TransferError;
use sealdrop_core::{AliasInfo, ChunkId, FileId, FileRecord, PublicUser};
use sealdrop_transfer::{
    FileDownloadResponse, FileStore, UploadFileAtomicRequest, UploadFileRequest,
};
use tokio_util::sync::CancellationToken;

pub struct InstrumentedStore<S> {
    pub inner: S,
    pub chunk0_calls: AtomicUsize,
    pub continue_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Artificial latency per bulk-chunk upload, to hold calls in flight.
    pub continue_delay: Option<Duration>,
    /// Cancelled when chunk 0 lands (exercises the post-chunk-0 abort check).
    pub cancel_on_chunk0: Option<CancellationToken>,
    /// Cancelled when the first bulk chunk lands (exercises mid-pool abort).
    pub cancel_on_first_continue: Option<CancellationToken>,
    /// Cancelled once this many download_chunk calls have been served.
    pub cancel_after_downloads: Option<(usize, CancellationToken)>,
}

impl<S> InstrumentedStore<S> {
    pub fn wrapping(inner: S) -> Self {
        Self {
            inner,
            chunk0_calls: AtomicUsize::new(0),
            continue_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            continue_delay: None,
            cancel_on_chunk0: None,
            cancel_on_first_continue: None,
            cancel_after_downloads: None,
        }
    }

    pub fn rpc_calls(&self) -> usize {
        self.chunk0_calls.load(Ordering::SeqCst)
            + self.continue_calls.load(Ordering::SeqCst)
            + self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: FileStore> FileStore for InstrumentedStore<S> {
    async fn upload_file_atomic(
        &self,
        request: UploadFileAtomicRequest,
    ) -> Result<FileId, TransferError> {
        self.chunk0_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.upload_file_atomic(request).await;
        if let Some(token) = &self.cancel_on_chunk0 {
            token.cancel();
        }
        result
    }

    async fn upload_file(&self, request: UploadFileRequest) -> Result<(), TransferError> {
        self.chunk0_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.upload_file(request).await;
        if let Some(token) = &self.cancel_on_chunk0 {
            token.cancel();
        }
        result
    }

    async fn upload_file_continue(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
        contents: Bytes,
    ) -> Result<(), TransferError> {
        let first = self.continue_calls.fetch_add(1, Ordering::SeqCst) == 0;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if first {
            if let Some(token) = &self.cancel_on_first_continue {
                token.cancel();
            }
        }
        if let Some(delay) = self.continue_delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.inner.upload_file_continue(file_id, chunk_id, contents).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn download_chunk(
        &self,
        file_id: FileId,
        chunk_id: ChunkId,
    ) -> Result<FileDownloadResponse, TransferError> {
        let served = self.download_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.download_chunk(file_id, chunk_id).await;
        if let Some((after, token)) = &self.cancel_after_downloads {
            if served >= *after {
                token.cancel();
            }
        }
        result
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, TransferError> {
        self.inner.list_files().await
    }

    async fn request_file(&self, name: &str) -> Result<String, TransferError> {
        self.inner.request_file(name).await
    }

    async fn alias_info(&self, alias: &str) -> Result<AliasInfo, TransferError> {
        self.inner.alias_info(alias).await
    }

    async fn share_file(
        &self,
        file_id: FileId,
        recipient: &str,
        wrapped_key: Vec<u8>,
    ) -> Result<(), TransferError> {
        self.inner.share_file(file_id, recipient, wrapped_key).await
    }

    async fn revoke_share(&self, file_id: FileId, recipient: &str) -> Result<(), TransferError> {
        self.inner.revoke_share(file_id, recipient).await
    }

    async fn get_users(&self) -> Result<Vec<PublicUser>, TransferError> {
        self.inner.get_users().await
    }
}

/// Drain everything currently buffered on an event receiver.
pub fn drain_events(
    rx: &mut tokio::sync::broadcast::Receiver<sealdrop_transfer::TransferEvent>,
) -> Vec<sealdrop_transfer::TransferEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count of terminal events in a drained sequence.
pub fn terminal_count(events: &[sealdrop_transfer::TransferEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}
