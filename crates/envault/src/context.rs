// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by every subcommand that touches secrets.

use std::sync::Arc;

use envault_config::model::EnvaultConfig;
use envault_core::EnvaultError;
use envault_storage::SqliteStore;
use envault_vault::{KeyRegistry, MasterKey, RecordCipher, RotationOrchestrator, SecretService};

/// An opened store plus the record cipher built over it.
pub struct AppContext {
    store: Arc<SqliteStore>,
    cipher: RecordCipher,
}

impl AppContext {
    /// Parse the master key, open the database and build the key registry.
    ///
    /// The master key is checked before the database is touched so a
    /// missing key never creates an empty database file.
    pub async fn open(config: &EnvaultConfig) -> Result<Self, EnvaultError> {
        let master = MasterKey::from_config(&config.crypto)?;
        let store = Arc::new(SqliteStore::open(config.storage.clone()).await?);
        Ok(Self::with_store(store, master))
    }

    pub fn with_store(store: Arc<SqliteStore>, master: MasterKey) -> Self {
        let registry = Arc::new(KeyRegistry::new(store.clone(), master));
        Self {
            store,
            cipher: RecordCipher::new(registry),
        }
    }

    pub fn cipher(&self) -> &RecordCipher {
        &self.cipher
    }

    pub fn secret_service(&self) -> SecretService {
        SecretService::new(self.store.clone(), self.cipher.clone())
    }

    pub fn orchestrator(&self, config: &EnvaultConfig) -> RotationOrchestrator {
        RotationOrchestrator::new(
            self.store.clone(),
            self.store.clone(),
            self.cipher.clone(),
            config.rotation.clone(),
        )
    }

    pub async fn close(&self) -> Result<(), EnvaultError> {
        self.store.close().await
    }
}
