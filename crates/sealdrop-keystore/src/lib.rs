//! sealdrop-keystore: durable local storage for the device keypair.
//!
//! One JSON file maps key labels to base64-encoded DER blobs. The device
//! keypair is stored under the labels `"public"` (SPKI) and `"private"`
//! (PKCS#8); the private half never leaves the device, which is what makes
//! document decryption device-bound.

pub mod store;

pub use store::{DeviceKeyStore, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL};
