// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Envault.

use thiserror::Error;

/// The primary error type used across the encryption, registry, and storage layers.
#[derive(Debug, Error)]
pub enum EnvaultError {
    /// Missing or malformed configuration, most importantly the master key.
    /// Fatal at startup; never retried.
    #[error("configuration error: {0}")]
    ConfigurationInvalid(String),

    /// MAC or AEAD tag mismatch. Deliberately carries no detail: a wrong key,
    /// a flipped bit, and bad padding are indistinguishable to the caller.
    #[error("authentication failed: ciphertext could not be verified")]
    AuthenticationFailed,

    /// Malformed envelope, wire string, or record value.
    #[error("invalid format: {0}")]
    FormatInvalid(String),

    /// A single record could not be migrated; the whole rotation was aborted
    /// and the new key was left unpromoted.
    #[error("migration of secret {record_id} to key {key_id} failed after {migrated} records: {source}")]
    MigrationFailed {
        record_id: String,
        key_id: String,
        migrated: usize,
        source: Box<EnvaultError>,
    },

    /// Records were still not on the new key after the last sweep pass, so
    /// the key was left unpromoted. Running rotation again resumes it.
    #[error("{pending} secret(s) still not on key {key_id} after the last sweep pass ({migrated} migrated)")]
    SweepIncomplete {
        key_id: String,
        pending: usize,
        migrated: usize,
    },

    /// A record references a data key that does not exist.
    #[error("data key not found: {0}")]
    KeyNotFound(String),

    /// No secret with this name exists for the user.
    #[error("secret {name} not found for user {user_id}")]
    SecretNotFound { user_id: String, name: String },

    /// Another rotation run currently holds the rotation lock.
    #[error("a key rotation is already in progress")]
    RotationInProgress,

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors (e.g. the system RNG failing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EnvaultError {
    /// True for the two failure kinds that mean "this ciphertext is not
    /// decryptable" and must never be partially trusted.
    pub fn is_undecryptable(&self) -> bool {
        matches!(
            self,
            EnvaultError::AuthenticationFailed | EnvaultError::FormatInvalid(_)
        )
    }
}
