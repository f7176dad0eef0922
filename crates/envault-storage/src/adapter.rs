// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the Envault storage traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use envault_config::model::StorageConfig;
use envault_core::{
    DataKey, DataKeyStore, EnvaultError, KeyStatus, KeyValueStore, RotationLock, SecretFilter,
    SecretRecord, SecretStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for secrets, data keys, the rotation lease, and
/// client state.
///
/// Wraps a [`Database`] handle and delegates every operation to the typed
/// query modules. The database is lazily opened by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the given configuration without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize a store in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, EnvaultError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), EnvaultError> {
        let db = Database::open_from_config(&self.config).await?;
        self.db.set(db).map_err(|_| EnvaultError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "sqlite store initialized");
        Ok(())
    }

    /// Checkpoint the WAL if the database was opened.
    pub async fn close(&self) -> Result<(), EnvaultError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
        }
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, EnvaultError> {
        self.db.get().ok_or_else(|| EnvaultError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SecretStore for SqliteStore {
    async fn upsert_secret(&self, record: &SecretRecord) -> Result<String, EnvaultError> {
        queries::secrets::upsert_secret(self.db()?, record).await
    }

    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>, EnvaultError> {
        queries::secrets::get_secret(self.db()?, id).await
    }

    async fn find_secret(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<SecretRecord>, EnvaultError> {
        queries::secrets::find_secret(self.db()?, user_id, name).await
    }

    async fn list_secrets(&self, filter: &SecretFilter) -> Result<Vec<SecretRecord>, EnvaultError> {
        queries::secrets::list_secrets(self.db()?, filter).await
    }

    async fn secrets_not_on_key(&self, key_id: &str) -> Result<Vec<SecretRecord>, EnvaultError> {
        queries::secrets::secrets_not_on_key(self.db()?, key_id).await
    }

    async fn update_ciphertext(
        &self,
        id: &str,
        expected_value: &str,
        value: &str,
        key_id: &str,
    ) -> Result<bool, EnvaultError> {
        queries::secrets::update_ciphertext(self.db()?, id, expected_value, value, key_id).await
    }

    async fn delete_secret(&self, user_id: &str, id: &str) -> Result<bool, EnvaultError> {
        queries::secrets::delete_secret(self.db()?, user_id, id).await
    }
}

#[async_trait]
impl DataKeyStore for SqliteStore {
    async fn insert_key(&self, key: &DataKey) -> Result<(), EnvaultError> {
        queries::keys::insert_key(self.db()?, key).await
    }

    async fn get_key(&self, id: &str) -> Result<Option<DataKey>, EnvaultError> {
        queries::keys::get_key(self.db()?, id).await
    }

    async fn list_keys(&self) -> Result<Vec<DataKey>, EnvaultError> {
        queries::keys::list_keys(self.db()?, None).await
    }

    async fn keys_with_status(&self, status: KeyStatus) -> Result<Vec<DataKey>, EnvaultError> {
        queries::keys::list_keys(self.db()?, Some(status)).await
    }

    async fn promote_exclusive(&self, id: &str) -> Result<Vec<String>, EnvaultError> {
        queries::keys::promote_exclusive(self.db()?, id).await
    }
}

#[async_trait]
impl RotationLock for SqliteStore {
    async fn try_acquire(&self, holder: &str, ttl_secs: u64) -> Result<bool, EnvaultError> {
        queries::rotation_lock::try_acquire(self.db()?, holder, ttl_secs).await
    }

    async fn release(&self, holder: &str) -> Result<(), EnvaultError> {
        queries::rotation_lock::release(self.db()?, holder).await
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_item(&self, name: &str) -> Result<Option<String>, EnvaultError> {
        queries::local_state::get_item(self.db()?, name).await
    }

    async fn set_item(&self, name: &str, value: &str) -> Result<(), EnvaultError> {
        queries::local_state::set_item(self.db()?, name, value).await
    }

    async fn remove_item(&self, name: &str) -> Result<(), EnvaultError> {
        queries::local_state::remove_item(self.db()?, name).await
    }
}
