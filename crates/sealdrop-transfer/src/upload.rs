//! Upload controller: encrypt, size-check, chunk, push through a bounded
//! pool.
//!
//! Chunk 0 goes out synchronously (it creates or advances the file record);
//! chunks `[1, n)` are dispatched through a semaphore-gated task pool with
//! at most `upload_concurrency` calls in flight. Completion order across
//! bulk chunks is not guaranteed and the backend does not require it.

use std::sync::Arc;

use bytes::Bytes;
use sealdrop_core::config::TransferConfig;
use sealdrop_core::error::TransferError;
use sealdrop_core::{AliasInfo, FileId};
use sealdrop_crypto::{CryptoEngine, Document};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{FileStore, UploadFileAtomicRequest, UploadFileRequest};
use crate::events::{TransferEvent, TransferEvents};
use crate::plan::ChunkPlan;

/// Where an upload is headed: a brand-new file owned by the caller, or a
/// pending request created by someone else and resolved via its alias.
#[derive(Debug, Clone)]
pub enum UploadTarget {
    SelfUpload { file_name: String },
    Request(AliasInfo),
}

/// Non-error terminal outcome of an upload invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed(FileId),
    Aborted,
}

/// One upload transfer. Each instance owns its own abort token and event
/// channel; instances are never shared across transfers.
pub struct Uploader<S: FileStore> {
    store: Arc<S>,
    config: TransferConfig,
    events: TransferEvents,
    cancel: CancellationToken,
}

impl<S: FileStore + 'static> Uploader<S> {
    pub fn new(store: Arc<S>, config: TransferConfig) -> Self {
        Self::with_abort_token(store, config, CancellationToken::new())
    }

    /// Tie this transfer to an externally owned cancellation token (e.g. a
    /// session-wide shutdown token). Cancelling the token aborts the
    /// transfer exactly as [`Uploader::abort`] does.
    pub fn with_abort_token(store: Arc<S>, config: TransferConfig, cancel: CancellationToken) -> Self {
        Self {
            store,
            config,
            events: TransferEvents::default(),
            cancel,
        }
    }

    /// Event stream for this transfer (UI and tests subscribe alike).
    pub fn events(&self) -> &TransferEvents {
        &self.events
    }

    /// Request cooperative cancellation. Idempotent; in-flight chunk calls
    /// run to completion, nothing further is dispatched.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Token observed by this transfer; handed to whatever drives abort.
    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Encrypt `contents` and upload it chunk by chunk.
    ///
    /// Emits exactly one terminal event: `Completed` / `Aborted` on the `Ok`
    /// path, `Failed` alongside the returned error otherwise.
    pub async fn upload(
        &self,
        engine: &mut CryptoEngine,
        target: UploadTarget,
        contents: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadOutcome, TransferError> {
        match self.run_upload(engine, target, contents, content_type).await {
            Ok(UploadOutcome::Completed(file_id)) => {
                info!(file_id, "upload complete");
                self.events.emit(TransferEvent::Completed { file_id });
                Ok(UploadOutcome::Completed(file_id))
            }
            Ok(UploadOutcome::Aborted) => {
                debug!("upload aborted");
                self.events.emit(TransferEvent::Aborted);
                Ok(UploadOutcome::Aborted)
            }
            Err(err) => {
                warn!(error = %err, "upload failed");
                self.events.emit(TransferEvent::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_upload(
        &self,
        engine: &mut CryptoEngine,
        target: UploadTarget,
        contents: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadOutcome, TransferError> {
        // For a requested file the key is wrapped for the requester; for a
        // self-upload, for this device.
        let (file_name, recipient_key) = match &target {
            UploadTarget::Request(info) => (info.file_name.clone(), info.user.public_key.clone()),
            UploadTarget::SelfUpload { file_name } => {
                (file_name.clone(), engine.device_public_key()?)
            }
        };

        let mut document = Document::from_plaintext(file_name.clone(), contents);
        let wrapped_key = document.wrapped_key_for(engine, &recipient_key)?;
        let encrypted = Bytes::from(document.encrypt()?);

        let total_bytes = encrypted.len() as u64;
        if total_bytes > self.config.max_encrypted_bytes {
            // Fail fast: no network call has been made yet.
            return Err(TransferError::SizeLimit {
                actual: total_bytes,
                limit: self.config.max_encrypted_bytes,
            });
        }

        let plan = ChunkPlan::new(encrypted.len(), self.config.chunk_size);
        debug!(
            file_name = %file_name,
            total_bytes,
            chunks = plan.chunk_count(),
            "starting upload"
        );
        self.events.emit(TransferEvent::UploadStarted { total_bytes });

        let first_chunk = encrypted.slice(plan.range(0));
        let first_len = first_chunk.len() as u64;

        let file_id = match &target {
            UploadTarget::Request(info) => {
                self.store
                    .upload_file(UploadFileRequest {
                        file_id: info.file_id,
                        file_content: first_chunk,
                        owner_key: wrapped_key,
                        file_type: content_type.to_string(),
                        num_chunks: plan.chunk_count(),
                    })
                    .await?;
                info.file_id
            }
            UploadTarget::SelfUpload { .. } => {
                self.store
                    .upload_file_atomic(UploadFileAtomicRequest {
                        name: file_name,
                        content: first_chunk,
                        owner_key: wrapped_key,
                        file_type: content_type.to_string(),
                        num_chunks: plan.chunk_count(),
                    })
                    .await?
            }
        };
        self.events.emit(TransferEvent::ChunkUploaded {
            chunk_id: 0,
            bytes: first_len,
        });

        // Chunk 0 is past the point of no return; the abort flag is first
        // honored here, between chunk 0 and the bulk phase.
        if self.cancel.is_cancelled() {
            return Ok(UploadOutcome::Aborted);
        }

        self.upload_remaining(file_id, &encrypted, plan).await?;

        if self.cancel.is_cancelled() {
            return Ok(UploadOutcome::Aborted);
        }
        Ok(UploadOutcome::Completed(file_id))
    }

    /// Dispatch chunks `[1, n)` through the bounded pool.
    async fn upload_remaining(
        &self,
        file_id: FileId,
        encrypted: &Bytes,
        plan: ChunkPlan,
    ) -> Result<(), TransferError> {
        let pool = Arc::new(Semaphore::new(self.config.upload_concurrency));
        // Child token: a failed chunk stops further dispatch without turning
        // the whole transfer into a user abort.
        let stop = self.cancel.child_token();
        let mut tasks: JoinSet<Result<(), TransferError>> = JoinSet::new();

        for chunk_id in 1..plan.chunk_count() {
            let chunk = encrypted.slice(plan.range(chunk_id));
            let store = Arc::clone(&self.store);
            let pool = Arc::clone(&pool);
            let stop = stop.clone();
            let events = self.events.clone();

            tasks.spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| TransferError::Backend(anyhow::anyhow!("chunk pool closed: {e}")))?;

                // Checked after admission, before the send: an observed
                // abort suppresses this chunk entirely.
                if stop.is_cancelled() {
                    debug!(file_id, chunk_id, "chunk skipped: transfer stopped");
                    return Ok(());
                }

                let bytes = chunk.len() as u64;
                store.upload_file_continue(file_id, chunk_id, chunk).await?;
                events.emit(TransferEvent::ChunkUploaded { chunk_id, bytes });
                Ok(())
            });
        }

        let mut first_error: Option<TransferError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|join_err| {
                Err(TransferError::Backend(anyhow::anyhow!(
                    "chunk task panicked: {join_err}"
                )))
            });

            if let Err(err) = result {
                if first_error.is_none() {
                    warn!(file_id, error = %err, "chunk upload failed, stopping dispatch");
                    stop.cancel();
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
