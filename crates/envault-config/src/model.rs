// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Envault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Envault configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvaultConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key material and key-derivation settings.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Key-rotation run settings.
    #[serde(default)]
    pub rotation: RotationConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("envault").join("envault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("envault.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Key material configuration.
///
/// The master key is supplied out of band (config file or environment) and
/// only ever wraps data keys; it is never generated here.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    /// Master key as 64 hex characters (32 bytes). `None` means not configured;
    /// commands that touch server secrets refuse to start without it.
    #[serde(default)]
    pub master_key: Option<String>,

    /// Application-supplied secret the client state adapter derives its
    /// per-write keys from.
    #[serde(default = "default_client_secret")]
    pub client_secret: String,

    /// PBKDF2-HMAC-SHA256 iteration count for the client state adapter.
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            master_key: None,
            client_secret: default_client_secret(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
        }
    }
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("client_secret", &"[REDACTED]")
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .finish()
    }
}

fn default_client_secret() -> String {
    "envault-secure-storage-key-v1".to_string()
}

/// Minimum accepted PBKDF2 iteration count.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

fn default_pbkdf2_iterations() -> u32 {
    MIN_PBKDF2_ITERATIONS
}

/// Key-rotation run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RotationConfig {
    /// How many times the sweep re-scans for records not yet on the new key
    /// before promoting it.
    #[serde(default = "default_max_sweep_passes")]
    pub max_sweep_passes: u32,

    /// Age in seconds after which a held rotation lock is considered abandoned.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_sweep_passes: default_max_sweep_passes(),
            lock_ttl_secs: default_lock_ttl_secs(),
        }
    }
}

fn default_max_sweep_passes() -> u32 {
    3
}

fn default_lock_ttl_secs() -> u64 {
    900
}
