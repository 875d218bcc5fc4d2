//! Typed transfer events over a single-producer, multi-consumer channel.
//!
//! Both the UI and test harnesses subscribe the same way; the controllers
//! never know who is listening. Exactly one terminal event
//! (completed / aborted / failed) fires per transfer invocation.

use sealdrop_core::FileId;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    UploadStarted { total_bytes: u64 },
    ChunkUploaded { chunk_id: u64, bytes: u64 },
    DownloadStarted,
    ChunkDownloaded { current: u64, total: u64 },
    Decrypting,
    Completed { file_id: FileId },
    Aborted,
    Failed { message: String },
}

impl TransferEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferEvent::Completed { .. } | TransferEvent::Aborted | TransferEvent::Failed { .. }
        )
    }
}

/// Broadcast channel for one transfer's events.
///
/// Emitting with no subscribers is a no-op; slow subscribers may observe a
/// lagged receiver per tokio broadcast semantics.
#[derive(Debug, Clone)]
pub struct TransferEvents {
    tx: broadcast::Sender<TransferEvent>,
}

impl TransferEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: TransferEvent) {
        // A send error only means nobody is subscribed right now.
        let _ = self.tx.send(event);
    }
}

impl Default for TransferEvents {
    fn default() -> Self {
        // Room for one event per chunk of a max-size transfer.
        Self::new(256)
    }
}
