// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for wrapped data keys and the rotation lease.

use async_trait::async_trait;

use crate::error::EnvaultError;
use crate::types::{DataKey, KeyStatus};

/// Table of wrapped data keys with their lifecycle status.
///
/// Keys only become active through [`DataKeyStore::promote_exclusive`], so
/// at most one key is ever active.
#[async_trait]
pub trait DataKeyStore: Send + Sync {
    /// Insert a new key row.
    async fn insert_key(&self, key: &DataKey) -> Result<(), EnvaultError>;

    /// Look up a key by id.
    async fn get_key(&self, id: &str) -> Result<Option<DataKey>, EnvaultError>;

    /// List all keys, oldest first.
    async fn list_keys(&self) -> Result<Vec<DataKey>, EnvaultError>;

    /// List keys currently in `status`, oldest first.
    async fn keys_with_status(&self, status: KeyStatus) -> Result<Vec<DataKey>, EnvaultError>;

    /// Retire every other `active` key and mark `id` active, atomically.
    ///
    /// Returns the ids that were retired. Errors with `KeyNotFound` if `id`
    /// is absent, in which case no status changes.
    async fn promote_exclusive(&self, id: &str) -> Result<Vec<String>, EnvaultError>;
}

/// Exclusive lease held for the duration of a rotation sweep.
#[async_trait]
pub trait RotationLock: Send + Sync {
    /// Try to take the lease for `holder`. A lease older than `ttl_secs`
    /// is treated as abandoned and taken over. Returns `false` if another
    /// live holder has it.
    async fn try_acquire(&self, holder: &str, ttl_secs: u64) -> Result<bool, EnvaultError>;

    /// Release the lease if `holder` still owns it.
    async fn release(&self, holder: &str) -> Result<(), EnvaultError>;
}
