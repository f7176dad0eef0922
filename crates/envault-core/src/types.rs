// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the encryption layer and the persistence layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a data key.
///
/// Transitions are driven only by the rotation orchestrator:
/// `Migrating -> Active -> Retired`. Keys are never deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Created by a rotation run that has not (yet) completed its sweep.
    Migrating,
    /// The single key new writes are encrypted under.
    Active,
    /// Superseded; kept so records that were never migrated stay readable.
    Retired,
}

/// A row of the data-key registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataKey {
    pub id: String,
    /// The raw key, sealed under the master key in server wire format.
    pub encrypted_key: String,
    pub status: KeyStatus,
    pub created_at: String,
}

/// A stored secret.
///
/// `key_id == None` means the value is in legacy format (sealed directly
/// under the master key). Otherwise the value is `v1:<key_id>:<wire>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub value: String,
    pub key_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SecretRecord {
    /// True when the record is already encrypted under `key_id`.
    pub fn is_on_key(&self, key_id: &str) -> bool {
        self.key_id.as_deref() == Some(key_id)
    }
}

/// Filter for listing secrets. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretFilter {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
}

impl SecretFilter {
    /// All secrets owned by `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            project_id: None,
        }
    }

    /// Narrow the filter to one project.
    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}
