// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-key registry: creation, unwrapping, and status transitions.
//!
//! A data key is 32 random bytes. Its hex text is sealed under the master key
//! with the server codec and stored as the row's `encrypted_key`. Unwrapped
//! keys are cached for the registry's lifetime so a rotation sweep unwraps
//! each old key once.

use std::collections::HashMap;
use std::sync::Arc;

use envault_core::{DataKey, DataKeyStore, EnvaultError, KeyStatus};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::codec;
use crate::crypto::{self, KEY_LEN};
use crate::master_key::MasterKey;

/// An unwrapped data key.
pub type DataKeyBytes = Zeroizing<[u8; KEY_LEN]>;

/// Seal a raw data key under the master key.
pub fn wrap_data_key(master: &MasterKey, raw: &[u8; KEY_LEN]) -> Result<String, EnvaultError> {
    let hex_key = Zeroizing::new(hex::encode(raw));
    codec::encrypt_secret(&hex_key, master.as_bytes())
}

/// Open a wrapped data key.
pub fn unwrap_data_key(master: &MasterKey, wrapped: &str) -> Result<DataKeyBytes, EnvaultError> {
    let hex_key = Zeroizing::new(codec::decrypt_secret(wrapped, master.as_bytes())?);
    let mut raw = Zeroizing::new([0u8; KEY_LEN]);
    hex::decode_to_slice(hex_key.as_str(), raw.as_mut()).map_err(|_| {
        EnvaultError::FormatInvalid("unwrapped data key is not 64 hex characters".to_string())
    })?;
    Ok(raw)
}

pub struct KeyRegistry {
    store: Arc<dyn DataKeyStore>,
    master: MasterKey,
    cache: RwLock<HashMap<String, DataKeyBytes>>,
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("master", &self.master)
            .finish_non_exhaustive()
    }
}

impl KeyRegistry {
    pub fn new(store: Arc<dyn DataKeyStore>, master: MasterKey) -> Self {
        Self {
            store,
            master,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn master_key(&self) -> &MasterKey {
        &self.master
    }

    /// Generate, wrap, and insert a new key with status `migrating`.
    pub async fn create_key(&self) -> Result<DataKey, EnvaultError> {
        let raw = crypto::generate_random_key()?;
        let key = DataKey {
            id: uuid::Uuid::new_v4().to_string(),
            encrypted_key: wrap_data_key(&self.master, &raw)?,
            status: KeyStatus::Migrating,
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };
        self.store.insert_key(&key).await?;
        self.cache.write().await.insert(key.id.clone(), raw);
        info!(key_id = %key.id, "created data key");
        Ok(key)
    }

    /// Look up and unwrap key `id`.
    pub async fn resolve_key(&self, id: &str) -> Result<DataKeyBytes, EnvaultError> {
        if let Some(raw) = self.cache.read().await.get(id) {
            return Ok(raw.clone());
        }
        let key = self
            .store
            .get_key(id)
            .await?
            .ok_or_else(|| EnvaultError::KeyNotFound(id.to_string()))?;
        let raw = unwrap_data_key(&self.master, &key.encrypted_key)?;
        self.cache.write().await.insert(id.to_string(), raw.clone());
        debug!(key_id = %id, "unwrapped data key");
        Ok(raw)
    }

    /// Make `id` the only active key, retiring the previous one in the same
    /// store write. Returns the ids retired.
    pub async fn promote_exclusive(&self, id: &str) -> Result<Vec<String>, EnvaultError> {
        let retired = self.store.promote_exclusive(id).await?;
        info!(key_id = %id, "promoted data key to active");
        for key_id in &retired {
            info!(key_id = %key_id, "retired data key");
        }
        Ok(retired)
    }

    /// The current active key, if any.
    pub async fn active_key(&self) -> Result<Option<DataKey>, EnvaultError> {
        let mut active = self.store.keys_with_status(KeyStatus::Active).await?;
        if active.len() > 1 {
            warn!(count = active.len(), "more than one active data key; using the newest");
        }
        Ok(active.pop())
    }

    /// The newest key left in `migrating` by an unfinished rotation.
    pub async fn find_migrating(&self) -> Result<Option<DataKey>, EnvaultError> {
        Ok(self
            .store
            .keys_with_status(KeyStatus::Migrating)
            .await?
            .pop())
    }

    pub async fn list_keys(&self) -> Result<Vec<DataKey>, EnvaultError> {
        self.store.list_keys().await
    }
}
