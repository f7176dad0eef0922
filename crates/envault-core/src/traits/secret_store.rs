// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for encrypted secret records.

use async_trait::async_trait;

use crate::error::EnvaultError;
use crate::types::{SecretFilter, SecretRecord};

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Insert or replace the secret identified by `(user_id, name)`.
    ///
    /// On conflict the existing row keeps its id and takes the new value,
    /// key id, and project. Returns the id of the stored row.
    async fn upsert_secret(&self, record: &SecretRecord) -> Result<String, EnvaultError>;

    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>, EnvaultError>;

    async fn find_secret(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<SecretRecord>, EnvaultError>;

    /// List secrets matching `filter`, ordered by id.
    async fn list_secrets(&self, filter: &SecretFilter) -> Result<Vec<SecretRecord>, EnvaultError>;

    /// List every secret whose `key_id` is not `key_id` (including legacy
    /// records with no key id), ordered by id.
    async fn secrets_not_on_key(&self, key_id: &str) -> Result<Vec<SecretRecord>, EnvaultError>;

    /// Replace a record's value and key id together, as one update, but only
    /// while the stored value still equals `expected_value`.
    ///
    /// Returns `false` when the row was rewritten or deleted since it was
    /// read; nothing is changed then.
    async fn update_ciphertext(
        &self,
        id: &str,
        expected_value: &str,
        value: &str,
        key_id: &str,
    ) -> Result<bool, EnvaultError>;

    /// Delete a secret owned by `user_id`. Returns whether a row was removed.
    async fn delete_secret(&self, user_id: &str, id: &str) -> Result<bool, EnvaultError>;
}
