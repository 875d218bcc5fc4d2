//! Client half of the sharing flow.
//!
//! Sharing never re-encrypts file bytes: the owner unwraps the file key
//! with their own device key and re-wraps it under the recipient's public
//! key, then registers the new wrapped key with the backend.

use sealdrop_core::error::TransferError;
use sealdrop_core::{FileId, PublicUser};
use sealdrop_crypto::CryptoEngine;
use tracing::info;

use crate::api::FileStore;

/// Grant `recipient` access to a fully uploaded file.
pub async fn share_with<S: FileStore>(
    store: &S,
    engine: &mut CryptoEngine,
    file_id: FileId,
    recipient: &PublicUser,
) -> Result<(), TransferError> {
    // Chunk 0 carries the caller's wrapped key.
    let first = store
        .download_chunk(file_id, 0)
        .await?
        .into_found(file_id, 0)?;

    let file_key = engine.unwrap_key_for_self(&first.owner_key)?;
    let wrapped = engine.wrap_key_for_recipient(file_key.as_bytes(), &recipient.public_key)?;

    store
        .share_file(file_id, &recipient.username, wrapped)
        .await?;

    info!(file_id, recipient = %recipient.username, "file shared");
    Ok(())
}

/// Withdraw a previously granted share.
pub async fn revoke_share<S: FileStore>(
    store: &S,
    file_id: FileId,
    recipient: &str,
) -> Result<(), TransferError> {
    store.revoke_share(file_id, recipient).await?;
    info!(file_id, recipient, "share revoked");
    Ok(())
}
