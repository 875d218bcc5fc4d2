//! File-backed key-value store for device key material.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use sealdrop_core::error::KeyStoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Label under which the device public key (SPKI DER) is stored.
pub const PUBLIC_KEY_LABEL: &str = "public";

/// Label under which the device private key (PKCS#8 DER) is stored.
pub const PRIVATE_KEY_LABEL: &str = "private";

/// On-disk layout: labels mapped to base64 DER.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    keys: BTreeMap<String, String>,
}

/// Durable key store backed by a single JSON file.
///
/// Writes go through a temp file and rename, so a keypair written with
/// [`DeviceKeyStore::store_keypair`] is replaced atomically from the
/// caller's perspective: readers observe either the old pair or the new
/// one, never one half of each.
#[derive(Debug, Clone)]
pub struct DeviceKeyStore {
    path: PathBuf,
}

impl DeviceKeyStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the DER blob stored under `label`, if any.
    pub fn load_key(&self, label: &str) -> Result<Option<Vec<u8>>, KeyStoreError> {
        let file = self.read_file()?;
        match file.keys.get(label) {
            None => Ok(None),
            Some(encoded) => {
                let der = B64.decode(encoded).map_err(|e| {
                    KeyStoreError::Corrupt(format!("key {label:?} is not valid base64: {e}"))
                })?;
                Ok(Some(der))
            }
        }
    }

    /// Store one DER blob under `label`, preserving other labels.
    pub fn store_key(&self, label: &str, der: &[u8]) -> Result<(), KeyStoreError> {
        let mut file = self.read_file()?;
        file.keys.insert(label.to_string(), B64.encode(der));
        self.write_file(&file)
    }

    /// Store both halves of the device keypair in a single write.
    ///
    /// Replaces any previously stored pair; the two halves can never go out
    /// of sync because they land in the same atomic rename.
    pub fn store_keypair(
        &self,
        public_der: &[u8],
        private_der: &[u8],
    ) -> Result<(), KeyStoreError> {
        let mut file = self.read_file()?;
        file.keys
            .insert(PUBLIC_KEY_LABEL.to_string(), B64.encode(public_der));
        file.keys
            .insert(PRIVATE_KEY_LABEL.to_string(), B64.encode(private_der));
        self.write_file(&file)?;
        debug!(path = %self.path.display(), "device keypair persisted");
        Ok(())
    }

    /// Remove every stored key.
    pub fn clear(&self) -> Result<(), KeyStoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn read_file(&self) -> Result<StoreFile, KeyStoreError> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw)
            .map_err(|e| KeyStoreError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    fn write_file(&self, file: &StoreFile) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| KeyStoreError::Corrupt(format!("serializing key store: {e}")))?;

        let tmp = self.path.with_extension("sealdrop_tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DeviceKeyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DeviceKeyStore::open(dir.path().join("keys.json"));
        (dir, store)
    }

    #[test]
    fn missing_store_yields_no_keys() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load_key(PUBLIC_KEY_LABEL).unwrap(), None);
        assert_eq!(store.load_key(PRIVATE_KEY_LABEL).unwrap(), None);
    }

    #[test]
    fn store_and_load_roundtrip() {
        let (_dir, store) = temp_store();
        store.store_key("public", b"spki-der-bytes").unwrap();

        let loaded = store.load_key("public").unwrap();
        assert_eq!(loaded.as_deref(), Some(b"spki-der-bytes".as_ref()));
    }

    #[test]
    fn keypair_lands_in_one_write() {
        let (_dir, store) = temp_store();
        store.store_keypair(b"pub-der", b"priv-der").unwrap();

        assert_eq!(
            store.load_key(PUBLIC_KEY_LABEL).unwrap().as_deref(),
            Some(b"pub-der".as_ref())
        );
        assert_eq!(
            store.load_key(PRIVATE_KEY_LABEL).unwrap().as_deref(),
            Some(b"priv-der".as_ref())
        );
        // No leftover temp file from the atomic write.
        assert!(!store.path().with_extension("sealdrop_tmp").exists());
    }

    #[test]
    fn store_keypair_replaces_previous_pair() {
        let (_dir, store) = temp_store();
        store.store_keypair(b"old-pub", b"old-priv").unwrap();
        store.store_keypair(b"new-pub", b"new-priv").unwrap();

        assert_eq!(
            store.load_key(PUBLIC_KEY_LABEL).unwrap().as_deref(),
            Some(b"new-pub".as_ref())
        );
        assert_eq!(
            store.load_key(PRIVATE_KEY_LABEL).unwrap().as_deref(),
            Some(b"new-priv".as_ref())
        );
    }

    #[test]
    fn clear_removes_all_keys() {
        let (_dir, store) = temp_store();
        store.store_keypair(b"pub", b"priv").unwrap();
        store.clear().unwrap();

        assert_eq!(store.load_key(PUBLIC_KEY_LABEL).unwrap(), None);
        assert_eq!(store.load_key(PRIVATE_KEY_LABEL).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported_not_swallowed() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "not json at all").unwrap();

        let err = store.load_key(PUBLIC_KEY_LABEL).unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt(_)));
    }

    #[test]
    fn corrupt_base64_is_reported() {
        let (_dir, store) = temp_store();
        std::fs::write(
            store.path(),
            r#"{"keys":{"public":"!!! not base64 !!!"}}"#,
        )
        .unwrap();

        let err = store.load_key(PUBLIC_KEY_LABEL).unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt(_)));
    }
}
