// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The master key: supplied as configuration, used only to wrap data keys
//! and to read legacy records.

use envault_config::model::CryptoConfig;
use envault_config::validation::check_master_key_hex;
use envault_core::EnvaultError;
use zeroize::Zeroizing;

use crate::crypto::KEY_LEN;

/// A parsed 256-bit master key. Debug output never shows the key.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<[u8; KEY_LEN]>);

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

impl MasterKey {
    /// Parse 64 hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, EnvaultError> {
        check_master_key_hex(hex_key).map_err(EnvaultError::ConfigurationInvalid)?;
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        hex::decode_to_slice(hex_key, key.as_mut()).map_err(|_| {
            EnvaultError::ConfigurationInvalid("master key is not valid hex".to_string())
        })?;
        Ok(Self(key))
    }

    /// Read the master key from configuration. Absence is a configuration error.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, EnvaultError> {
        let hex_key = config.master_key.as_deref().ok_or_else(|| {
            EnvaultError::ConfigurationInvalid(
                "crypto.master_key is not set (config file, ENVAULT_CRYPTO_MASTER_KEY, or ENCRYPTION_KEY)"
                    .to_string(),
            )
        })?;
        Self::from_hex(hex_key)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}
