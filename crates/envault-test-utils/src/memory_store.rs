// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage for fast, deterministic tests.
//!
//! `MemoryStore` implements all four storage traits with the same observable
//! semantics as the SQLite store: upsert on `(user_id, name)`, at most one
//! active key, and a TTL lease. Faults can be injected to exercise the
//! rotation failure paths.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use envault_core::{
    DataKey, DataKeyStore, EnvaultError, KeyStatus, KeyValueStore, RotationLock, SecretFilter,
    SecretRecord, SecretStore,
};

#[derive(Default)]
struct Inner {
    /// Keyed by id so listings come back ordered by id.
    secrets: BTreeMap<String, SecretRecord>,
    /// Insertion order is creation order.
    keys: Vec<DataKey>,
    lock: Option<(String, i64)>,
    items: HashMap<String, String>,
    failing_updates: HashSet<String>,
    /// Written into `secrets` on the next `update_ciphertext` call.
    concurrent_writes: Vec<SecretRecord>,
    /// Takes the rotation lease on the next `update_ciphertext` call.
    lock_thief: Option<String>,
    update_calls: usize,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Make `update_ciphertext` fail for `record_id`.
    pub async fn fail_updates_for(&self, record_id: &str) {
        self.inner
            .lock()
            .await
            .failing_updates
            .insert(record_id.to_string());
    }

    /// Simulate a write racing a rotation sweep: `record` is upserted the next
    /// time any record's ciphertext is updated.
    pub async fn write_during_next_update(&self, record: SecretRecord) {
        self.inner.lock().await.concurrent_writes.push(record);
    }

    /// Simulate another run taking over the rotation lease mid-sweep:
    /// `holder` owns the lease from the next `update_ciphertext` call on.
    pub async fn take_lock_during_next_update(&self, holder: &str) {
        self.inner.lock().await.lock_thief = Some(holder.to_string());
    }

    /// Current lease holder, if any.
    pub async fn lock_holder(&self) -> Option<String> {
        self.inner.lock().await.lock.as_ref().map(|(holder, _)| holder.clone())
    }

    /// Number of `update_ciphertext` calls so far.
    pub async fn update_calls(&self) -> usize {
        self.inner.lock().await.update_calls
    }

    /// Overwrite a stored value verbatim, bypassing encryption.
    pub async fn corrupt_value(&self, record_id: &str, value: &str) {
        if let Some(record) = self.inner.lock().await.secrets.get_mut(record_id) {
            record.value = value.to_string();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn upsert(inner: &mut Inner, record: &SecretRecord) -> String {
    let existing = inner
        .secrets
        .values_mut()
        .find(|s| s.user_id == record.user_id && s.name == record.name);
    if let Some(existing) = existing {
        existing.value = record.value.clone();
        existing.key_id = record.key_id.clone();
        existing.project_id = record.project_id.clone();
        existing.updated_at = now();
        return existing.id.clone();
    }

    let mut record = record.clone();
    if record.id.is_empty() {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    if record.created_at.is_empty() {
        record.created_at = now();
    }
    record.updated_at = now();
    let id = record.id.clone();
    inner.secrets.insert(id.clone(), record);
    id
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn upsert_secret(&self, record: &SecretRecord) -> Result<String, EnvaultError> {
        Ok(upsert(&mut *self.inner.lock().await, record))
    }

    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>, EnvaultError> {
        Ok(self.inner.lock().await.secrets.get(id).cloned())
    }

    async fn find_secret(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<SecretRecord>, EnvaultError> {
        Ok(self
            .inner
            .lock()
            .await
            .secrets
            .values()
            .find(|s| s.user_id == user_id && s.name == name)
            .cloned())
    }

    async fn list_secrets(&self, filter: &SecretFilter) -> Result<Vec<SecretRecord>, EnvaultError> {
        Ok(self
            .inner
            .lock()
            .await
            .secrets
            .values()
            .filter(|s| filter.user_id.as_ref().is_none_or(|u| *u == s.user_id))
            .filter(|s| {
                filter
                    .project_id
                    .as_ref()
                    .is_none_or(|p| s.project_id.as_ref() == Some(p))
            })
            .cloned()
            .collect())
    }

    async fn secrets_not_on_key(&self, key_id: &str) -> Result<Vec<SecretRecord>, EnvaultError> {
        Ok(self
            .inner
            .lock()
            .await
            .secrets
            .values()
            .filter(|s| !s.is_on_key(key_id))
            .cloned()
            .collect())
    }

    async fn update_ciphertext(
        &self,
        id: &str,
        expected_value: &str,
        value: &str,
        key_id: &str,
    ) -> Result<bool, EnvaultError> {
        let mut inner = self.inner.lock().await;
        inner.update_calls += 1;
        if inner.failing_updates.contains(id) {
            return Err(EnvaultError::Storage {
                source: format!("injected update failure for {id}").into(),
            });
        }
        for record in std::mem::take(&mut inner.concurrent_writes) {
            upsert(&mut inner, &record);
        }
        if let Some(holder) = inner.lock_thief.take() {
            inner.lock = Some((holder, chrono::Utc::now().timestamp()));
        }
        match inner.secrets.get_mut(id) {
            Some(record) if record.value == expected_value => {
                record.value = value.to_string();
                record.key_id = Some(key_id.to_string());
                record.updated_at = now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_secret(&self, user_id: &str, id: &str) -> Result<bool, EnvaultError> {
        let mut inner = self.inner.lock().await;
        let owned = inner
            .secrets
            .get(id)
            .is_some_and(|s| s.user_id == user_id);
        if owned {
            inner.secrets.remove(id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl DataKeyStore for MemoryStore {
    async fn insert_key(&self, key: &DataKey) -> Result<(), EnvaultError> {
        let mut inner = self.inner.lock().await;
        if inner.keys.iter().any(|k| k.id == key.id) {
            return Err(EnvaultError::Storage {
                source: format!("duplicate key id {}", key.id).into(),
            });
        }
        inner.keys.push(key.clone());
        Ok(())
    }

    async fn get_key(&self, id: &str) -> Result<Option<DataKey>, EnvaultError> {
        Ok(self
            .inner
            .lock()
            .await
            .keys
            .iter()
            .find(|k| k.id == id)
            .cloned())
    }

    async fn list_keys(&self) -> Result<Vec<DataKey>, EnvaultError> {
        Ok(self.inner.lock().await.keys.clone())
    }

    async fn keys_with_status(&self, status: KeyStatus) -> Result<Vec<DataKey>, EnvaultError> {
        Ok(self
            .inner
            .lock()
            .await
            .keys
            .iter()
            .filter(|k| k.status == status)
            .cloned()
            .collect())
    }

    async fn promote_exclusive(&self, id: &str) -> Result<Vec<String>, EnvaultError> {
        let mut inner = self.inner.lock().await;
        if !inner.keys.iter().any(|k| k.id == id) {
            return Err(EnvaultError::KeyNotFound(id.to_string()));
        }
        let mut retired = Vec::new();
        for key in inner.keys.iter_mut() {
            if key.id == id {
                key.status = KeyStatus::Active;
            } else if key.status == KeyStatus::Active {
                key.status = KeyStatus::Retired;
                retired.push(key.id.clone());
            }
        }
        Ok(retired)
    }
}

#[async_trait]
impl RotationLock for MemoryStore {
    async fn try_acquire(&self, holder: &str, ttl_secs: u64) -> Result<bool, EnvaultError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let mut inner = self.inner.lock().await;
        let free = match &inner.lock {
            None => true,
            Some((current, acquired_at)) => {
                current == holder || now.saturating_sub(*acquired_at) >= ttl
            }
        };
        if free {
            inner.lock = Some((holder.to_string(), now));
        }
        Ok(free)
    }

    async fn release(&self, holder: &str) -> Result<(), EnvaultError> {
        let mut inner = self.inner.lock().await;
        if inner.lock.as_ref().is_some_and(|(current, _)| current == holder) {
            inner.lock = None;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, name: &str) -> Result<Option<String>, EnvaultError> {
        Ok(self.inner.lock().await.items.get(name).cloned())
    }

    async fn set_item(&self, name: &str, value: &str) -> Result<(), EnvaultError> {
        self.inner
            .lock()
            .await
            .items
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<(), EnvaultError> {
        self.inner.lock().await.items.remove(name);
        Ok(())
    }
}
