//! sealdrop-transfer: the chunked transfer engine
//!
//! Upload pipeline: plaintext → encrypt (sealdrop-crypto) → size check →
//! fixed-size chunks → chunk 0 create-or-continue → bulk chunks through a
//! bounded pool (cap 5) → terminal event.
//!
//! Download pipeline: metadata lookup → chunk 0 (learns total count and the
//! wrapped key) → sequential chunk fetch with in-order reassembly →
//! decrypt → terminal event.
//!
//! Each controller instance owns its own cancellation token and event
//! channel; transfers never share mutable state. Cancellation is
//! cooperative: in-flight calls run to completion, further dispatch stops.

pub mod api;
pub mod download;
pub mod events;
pub mod memory;
pub mod plan;
pub mod progress;
pub mod share;
pub mod upload;

pub use api::{FileData, FileDownloadResponse, FileStore, UploadFileAtomicRequest, UploadFileRequest};
pub use download::{DownloadOutcome, DownloadedFile, Downloader};
pub use events::{TransferEvent, TransferEvents};
pub use memory::InMemoryFileStore;
pub use plan::ChunkPlan;
pub use progress::TransferMeter;
pub use share::{revoke_share, share_with};
pub use upload::{UploadOutcome, UploadTarget, Uploader};
