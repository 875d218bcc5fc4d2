//! Device keypair management and RSA-OAEP key wrapping.
//!
//! The engine is the one place that touches the device keypair: it loads it
//! from the key store on first use, generates and persists a fresh pair when
//! either half is missing, and caches the loaded pair in memory. It is an
//! explicit context object passed to callers; there is no ambient global
//! state, so each engine instance is independently testable.

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sealdrop_core::config::CryptoConfig;
use sealdrop_core::error::CryptoError;
use sealdrop_keystore::{DeviceKeyStore, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL};
use sha2::Sha256;
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::keys::FileKey;
use crate::KEY_SIZE;

struct DeviceKeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

/// Cryptographic context bound to one device's keypair.
pub struct CryptoEngine {
    store: DeviceKeyStore,
    modulus_bits: usize,
    device: Option<DeviceKeyPair>,
}

impl CryptoEngine {
    pub fn new(store: DeviceKeyStore, config: &CryptoConfig) -> Self {
        Self {
            store,
            modulus_bits: config.rsa_modulus_bits,
            device: None,
        }
    }

    /// Return this device's public key in SPKI DER encoding.
    ///
    /// Generates and persists a fresh keypair if the store holds no complete
    /// pair; both halves land in a single atomic key-store write.
    pub fn device_public_key(&mut self) -> Result<Vec<u8>, CryptoError> {
        self.ensure_device_pair()?;
        let pair = self.device.as_ref().ok_or(CryptoError::NoDeviceKey)?;
        let der = pair
            .public
            .to_public_key_der()
            .map_err(|e| CryptoError::BadKeyMaterial(format!("exporting public key: {e}")))?;
        Ok(der.as_bytes().to_vec())
    }

    /// Encrypt a raw file key under a recipient's SPKI public key.
    ///
    /// Pure function of its inputs; the recipient may be this device or any
    /// other user's device.
    pub fn wrap_key_for_recipient(
        &self,
        raw_key: &[u8],
        recipient_spki: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let public = RsaPublicKey::from_public_key_der(recipient_spki)
            .map_err(|e| CryptoError::BadKeyMaterial(format!("recipient public key: {e}")))?;

        public
            .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), raw_key)
            .map_err(|e| CryptoError::Wrap(e.to_string()))
    }

    /// Decrypt a wrapped file key with this device's private key.
    ///
    /// Fails with [`CryptoError::NoDeviceKey`] when the store holds no
    /// private key; a wrong key and a corrupted blob are indistinguishable.
    pub fn unwrap_key_for_self(&mut self, wrapped: &[u8]) -> Result<FileKey, CryptoError> {
        if self.device.is_none() {
            self.device = self.load_device_pair()?;
        }
        let pair = self.device.as_ref().ok_or(CryptoError::NoDeviceKey)?;

        let mut raw = pair
            .private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|_| CryptoError::Unwrap)?;

        if raw.len() != KEY_SIZE {
            raw.zeroize();
            return Err(CryptoError::Unwrap);
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(&raw);
        raw.zeroize();

        Ok(FileKey::from_bytes(key_bytes))
    }

    /// Drop the in-memory keypair cache (test/reset lifecycle hook). The
    /// next operation reloads from the key store.
    pub fn reset_cache(&mut self) {
        self.device = None;
    }

    fn ensure_device_pair(&mut self) -> Result<(), CryptoError> {
        if self.device.is_some() {
            return Ok(());
        }

        if let Some(pair) = self.load_device_pair()? {
            debug!("device keypair loaded from key store");
            self.device = Some(pair);
            return Ok(());
        }

        let pair = self.generate_device_pair()?;
        self.device = Some(pair);
        Ok(())
    }

    /// Load the persisted pair; `None` when either half is missing, which
    /// callers treat as "no pair at all" (the halves are only ever written
    /// together).
    fn load_device_pair(&self) -> Result<Option<DeviceKeyPair>, CryptoError> {
        let public_der = self.store.load_key(PUBLIC_KEY_LABEL)?;
        let private_der = self.store.load_key(PRIVATE_KEY_LABEL)?;

        match (public_der, private_der) {
            (Some(public_der), Some(private_der)) => {
                let public = RsaPublicKey::from_public_key_der(&public_der)
                    .map_err(|e| CryptoError::BadKeyMaterial(format!("stored public key: {e}")))?;
                let private = RsaPrivateKey::from_pkcs8_der(&private_der)
                    .map_err(|e| CryptoError::BadKeyMaterial(format!("stored private key: {e}")))?;
                Ok(Some(DeviceKeyPair { public, private }))
            }
            _ => Ok(None),
        }
    }

    fn generate_device_pair(&self) -> Result<DeviceKeyPair, CryptoError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, self.modulus_bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let public_der = public
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyGeneration(format!("exporting public key: {e}")))?;
        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyGeneration(format!("exporting private key: {e}")))?;

        self.store
            .store_keypair(public_der.as_bytes(), private_der.as_bytes())?;

        info!(modulus_bits = self.modulus_bits, "generated new device keypair");
        Ok(DeviceKeyPair { public, private })
    }
}
