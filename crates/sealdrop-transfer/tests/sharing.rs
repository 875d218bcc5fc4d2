//! Integration test: sharing re-wraps the file key per recipient; file
//! bytes are uploaded once and never re-encrypted.

use std::sync::Arc;

use sealdrop_core::config::{CryptoConfig, TransferConfig};
use sealdrop_core::error::TransferError;
use sealdrop_crypto::CryptoEngine;
use sealdrop_keystore::DeviceKeyStore;
use sealdrop_transfer::{
    revoke_share, share_with, DownloadOutcome, Downloader, FileStore, InMemoryFileStore,
    UploadOutcome, UploadTarget, Uploader,
};

fn test_engine(dir: &std::path::Path, name: &str) -> CryptoEngine {
    let store = DeviceKeyStore::open(dir.join(format!("{name}-keys.json")));
    CryptoEngine::new(
        store,
        &CryptoConfig {
            rsa_modulus_bits: 1024,
        },
    )
}

async fn upload_as_john(
    backend: &Arc<InMemoryFileStore>,
    engine: &mut CryptoEngine,
    payload: &[u8],
) -> sealdrop_core::FileId {
    let uploader = Uploader::new(
        Arc::clone(backend),
        TransferConfig {
            chunk_size: 64,
            ..TransferConfig::default()
        },
    );
    let outcome = uploader
        .upload(
            engine,
            UploadTarget::SelfUpload {
                file_name: "quarterly-report.pdf".into(),
            },
            payload.to_vec(),
            "application/pdf",
        )
        .await
        .expect("upload");
    match outcome {
        UploadOutcome::Completed(file_id) => file_id,
        UploadOutcome::Aborted => panic!("unexpected abort"),
    }
}

#[tokio::test]
async fn shared_recipient_downloads_with_their_own_device_key() {
    let tmp = tempfile::tempdir().unwrap();
    let mut john = test_engine(tmp.path(), "john");
    let mut jane = test_engine(tmp.path(), "jane");

    let backend = Arc::new(InMemoryFileStore::new("john"));
    backend.register_user("john", john.device_public_key().unwrap());
    backend.register_user("jane", jane.device_public_key().unwrap());

    let payload: Vec<u8> = (0u32..500).map(|i| (i % 251) as u8).collect();
    let file_id = upload_as_john(&backend, &mut john, &payload).await;

    // John picks Jane from the user list and shares.
    let users = backend.get_users().await.unwrap();
    let jane_user = users.iter().find(|u| u.username == "jane").unwrap();
    share_with(backend.as_ref(), &mut john, file_id, jane_user)
        .await
        .expect("share");

    // Jane sees the file among her accessible records.
    let jane_backend = Arc::new(backend.connect_as("jane"));
    let records = jane_backend.list_files().await.unwrap();
    assert!(records.iter().any(|r| r.file_id == file_id));

    // John's record lists Jane as a recipient.
    let john_records = backend.list_files().await.unwrap();
    let record = john_records.iter().find(|r| r.file_id == file_id).unwrap();
    assert!(record.shared_with.iter().any(|u| u.username == "jane"));

    // Jane decrypts with her own device key.
    let downloader = Downloader::new(Arc::clone(&jane_backend));
    let outcome = downloader
        .download(&mut jane, file_id)
        .await
        .expect("shared download");
    match outcome {
        DownloadOutcome::Completed(file) => assert_eq!(file.contents, payload),
        DownloadOutcome::Aborted => panic!("unexpected abort"),
    }
}

#[tokio::test]
async fn revoked_recipient_loses_access() {
    let tmp = tempfile::tempdir().unwrap();
    let mut john = test_engine(tmp.path(), "john");
    let mut jane = test_engine(tmp.path(), "jane");

    let backend = Arc::new(InMemoryFileStore::new("john"));
    backend.register_user("john", john.device_public_key().unwrap());
    backend.register_user("jane", jane.device_public_key().unwrap());

    let file_id = upload_as_john(&backend, &mut john, b"sensitive").await;

    let users = backend.get_users().await.unwrap();
    let jane_user = users.iter().find(|u| u.username == "jane").unwrap();
    share_with(backend.as_ref(), &mut john, file_id, jane_user)
        .await
        .expect("share");

    revoke_share(backend.as_ref(), file_id, "jane")
        .await
        .expect("revoke");

    let jane_backend = Arc::new(backend.connect_as("jane"));
    let downloader = Downloader::new(jane_backend);
    let result = downloader.download(&mut jane, file_id).await;

    assert!(matches!(
        result,
        Err(TransferError::NotFound(_)) | Err(TransferError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn sharing_requires_ownership() {
    let tmp = tempfile::tempdir().unwrap();
    let mut john = test_engine(tmp.path(), "john");
    let mut eve = test_engine(tmp.path(), "eve");

    let backend = Arc::new(InMemoryFileStore::new("john"));
    backend.register_user("john", john.device_public_key().unwrap());
    backend.register_user("eve", eve.device_public_key().unwrap());

    let file_id = upload_as_john(&backend, &mut john, b"private").await;

    // Eve cannot re-share a file she has no access to: the wrapped-key
    // fetch already fails the permission check.
    let users = backend.get_users().await.unwrap();
    let eve_user = users.iter().find(|u| u.username == "eve").unwrap().clone();

    let eve_backend = backend.connect_as("eve");
    let result = share_with(&eve_backend, &mut eve, file_id, &eve_user).await;
    assert!(matches!(result, Err(TransferError::PermissionDenied(_))));
}
