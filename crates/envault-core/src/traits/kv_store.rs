// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence collaborator for client-held state.

use async_trait::async_trait;

use crate::error::EnvaultError;

/// A flat string-to-string store (the client's local storage).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, name: &str) -> Result<Option<String>, EnvaultError>;

    async fn set_item(&self, name: &str, value: &str) -> Result<(), EnvaultError>;

    async fn remove_item(&self, name: &str) -> Result<(), EnvaultError>;
}
