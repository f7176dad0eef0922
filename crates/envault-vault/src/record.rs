// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single decryption entry point for stored secret records.

use std::sync::Arc;

use envault_core::{EnvaultError, SecretRecord};

use crate::codec::SecretCiphertext;
use crate::registry::KeyRegistry;

/// Decrypts records in either format, and seals values for storage.
#[derive(Debug, Clone)]
pub struct RecordCipher {
    registry: Arc<KeyRegistry>,
}

impl RecordCipher {
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    /// Decrypt a record: legacy values with the master key, wrapped values
    /// with the data key they name.
    pub async fn decrypt_secret_record(&self, record: &SecretRecord) -> Result<String, EnvaultError> {
        let ciphertext = SecretCiphertext::from_record(&record.value, record.key_id.as_deref())?;
        self.open(&ciphertext).await
    }

    /// Decrypt an already-parsed value.
    pub async fn open(&self, ciphertext: &SecretCiphertext) -> Result<String, EnvaultError> {
        match ciphertext {
            SecretCiphertext::Legacy { .. } => {
                ciphertext.open(self.registry.master_key().as_bytes())
            }
            SecretCiphertext::Wrapped { key_id, .. } => {
                let key = self.registry.resolve_key(key_id).await?;
                ciphertext.open(&key)
            }
        }
    }

    /// Seal `plaintext` under data key `key_id`.
    pub async fn seal_for_key(
        &self,
        key_id: &str,
        plaintext: &str,
    ) -> Result<SecretCiphertext, EnvaultError> {
        let key = self.registry.resolve_key(key_id).await?;
        SecretCiphertext::wrap(key_id, plaintext, &key)
    }

    /// Seal `plaintext` directly under the master key.
    pub fn seal_legacy(&self, plaintext: &str) -> Result<SecretCiphertext, EnvaultError> {
        SecretCiphertext::legacy(plaintext, self.registry.master_key().as_bytes())
    }
}
