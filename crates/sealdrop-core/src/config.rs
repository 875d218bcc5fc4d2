use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level client configuration (loaded from sealdrop.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealdropConfig {
    pub keystore: KeystoreConfig,
    pub crypto: CryptoConfig,
    pub transfer: TransferConfig,
    pub log: LogConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SealdropConfig {
    /// Load and parse a TOML config file. Missing keys fall back to their
    /// defaults section by section.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// Path to the device keypair store (JSON key-value file).
    pub path: PathBuf,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.config/sealdrop/device-keys.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// RSA modulus size for the device keypair, in bits (default: 4096).
    /// Tests shrink this to keep keypair generation fast.
    pub rsa_modulus_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            rsa_modulus_bits: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Fixed chunk size in bytes for the encrypted payload (default: 2 MB).
    pub chunk_size: usize,
    /// Maximum allowed encrypted payload size in bytes (default: 100 MiB).
    /// Checked client-side before any network call.
    pub max_encrypted_bytes: u64,
    /// Maximum number of chunk uploads in flight at once (default: 5).
    pub upload_concurrency: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2_000_000,
            max_encrypted_bytes: 100 * 1024 * 1024,
            upload_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
