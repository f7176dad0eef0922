// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret CRUD over encrypted storage.
//!
//! Writes are sealed under the current active data key in `v1:` format. Until
//! the first rotation has produced an active key, they are sealed under the
//! master key in legacy format.

use std::sync::Arc;

use envault_core::{EnvaultError, SecretFilter, SecretRecord, SecretStore};
use tracing::{debug, warn};

use crate::record::RecordCipher;

/// A listed secret with its decrypted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedSecret {
    pub id: String,
    pub name: String,
    pub project_id: Option<String>,
    /// `None` when the stored value could not be decrypted.
    pub value: Option<String>,
}

pub struct SecretService {
    secrets: Arc<dyn SecretStore>,
    cipher: RecordCipher,
}

impl SecretService {
    pub fn new(secrets: Arc<dyn SecretStore>, cipher: RecordCipher) -> Self {
        Self { secrets, cipher }
    }

    /// Encrypt and upsert `(user_id, name)`. Returns the record id.
    pub async fn save_secret(
        &self,
        user_id: &str,
        name: &str,
        value: &str,
        project_id: Option<&str>,
    ) -> Result<String, EnvaultError> {
        let ciphertext = match self.cipher.registry().active_key().await? {
            Some(active) => self.cipher.seal_for_key(&active.id, value).await?,
            None => self.cipher.seal_legacy(value)?,
        };
        let record = SecretRecord {
            id: String::new(),
            user_id: user_id.to_string(),
            project_id: project_id.map(str::to_string),
            name: name.to_string(),
            value: ciphertext.to_record_value(),
            key_id: ciphertext.key_id().map(str::to_string),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let id = self.secrets.upsert_secret(&record).await?;
        debug!(secret_id = %id, key_id = ?record.key_id, "saved secret");
        Ok(id)
    }

    pub async fn list_secrets(&self, filter: &SecretFilter) -> Result<Vec<SecretRecord>, EnvaultError> {
        self.secrets.list_secrets(filter).await
    }

    /// List and decrypt. Records that fail to decrypt are returned with no value.
    pub async fn list_revealed(
        &self,
        filter: &SecretFilter,
    ) -> Result<Vec<RevealedSecret>, EnvaultError> {
        let mut revealed = Vec::new();
        for record in self.secrets.list_secrets(filter).await? {
            let value = match self.cipher.decrypt_secret_record(&record).await {
                Ok(value) => Some(value),
                Err(e) if e.is_undecryptable() || matches!(e, EnvaultError::KeyNotFound(_)) => {
                    warn!(secret_id = %record.id, error = %e, "secret could not be decrypted");
                    None
                }
                Err(e) => return Err(e),
            };
            revealed.push(RevealedSecret {
                id: record.id,
                name: record.name,
                project_id: record.project_id,
                value,
            });
        }
        Ok(revealed)
    }

    /// Decrypt one secret by owner and name.
    pub async fn reveal_secret(&self, user_id: &str, name: &str) -> Result<Option<String>, EnvaultError> {
        match self.secrets.find_secret(user_id, name).await? {
            Some(record) => Ok(Some(self.cipher.decrypt_secret_record(&record).await?)),
            None => Ok(None),
        }
    }

    pub async fn delete_secret(&self, user_id: &str, id: &str) -> Result<bool, EnvaultError> {
        self.secrets.delete_secret(user_id, id).await
    }
}

/// Mask a secret for display: first and last four characters, or `****`
/// when shorter than ten characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
