// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as the master key's length and alphabet, non-empty paths, and KDF floors.

use crate::diagnostic::ConfigError;
use crate::model::{EnvaultConfig, MIN_PBKDF2_ITERATIONS};

/// Length of the hex-encoded master key (32 bytes).
pub const MASTER_KEY_HEX_LEN: usize = 64;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &EnvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(key) = &config.crypto.master_key {
        if let Err(message) = check_master_key_hex(key) {
            errors.push(ConfigError::Validation { message });
        }
    }

    if config.crypto.client_secret.is_empty() {
        errors.push(ConfigError::Validation {
            message: "crypto.client_secret must not be empty".to_string(),
        });
    }

    if config.crypto.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
        errors.push(ConfigError::Validation {
            message: format!(
                "crypto.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
                config.crypto.pbkdf2_iterations
            ),
        });
    }

    if config.rotation.max_sweep_passes < 1 {
        errors.push(ConfigError::Validation {
            message: "rotation.max_sweep_passes must be at least 1".to_string(),
        });
    }

    if config.rotation.lock_ttl_secs < 1 {
        errors.push(ConfigError::Validation {
            message: "rotation.lock_ttl_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that `key` is exactly 64 hex characters.
///
/// The error message never echoes the key itself.
pub fn check_master_key_hex(key: &str) -> Result<(), String> {
    if key.len() != MASTER_KEY_HEX_LEN {
        return Err(format!(
            "crypto.master_key must be {MASTER_KEY_HEX_LEN} hex characters, got {}",
            key.len()
        ));
    }
    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("crypto.master_key must contain only hex characters".to_string());
    }
    Ok(())
}
