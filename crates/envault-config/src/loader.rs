// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./envault.toml` > `~/.config/envault/envault.toml` > `/etc/envault/envault.toml`
//! with environment variable overrides via `ENVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EnvaultConfig;

/// Environment variable carrying the master key.
pub const MASTER_KEY_ENV_VAR: &str = "ENVAULT_CRYPTO_MASTER_KEY";

/// Older deployments supply the master key under this name.
pub const LEGACY_MASTER_KEY_ENV_VAR: &str = "ENCRYPTION_KEY";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/envault/envault.toml` (system-wide)
/// 3. `~/.config/envault/envault.toml` (user XDG config)
/// 4. `./envault.toml` (local directory)
/// 5. `ENVAULT_*` environment variables
/// 6. Master key from `ENVAULT_CRYPTO_MASTER_KEY`, falling back to `ENCRYPTION_KEY`
pub fn load_config() -> Result<EnvaultConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<EnvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EnvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EnvaultConfig, figment::Error> {
    let figment = Figment::new()
        .merge(Serialized::defaults(EnvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider());
    with_master_key_env(figment).extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    let figment = Figment::new()
        .merge(Serialized::defaults(EnvaultConfig::default()))
        .merge(Toml::file("/etc/envault/envault.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("envault/envault.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("envault.toml"))
        .merge(env_provider());
    with_master_key_env(figment)
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `ENVAULT_CRYPTO_MASTER_KEY` must
/// map to `crypto.master_key`, not `crypto.master.key`. The master key itself
/// is excluded here because figment would parse an all-digit hex string as a
/// number; [`with_master_key_env`] merges it verbatim instead.
fn env_provider() -> Env {
    Env::prefixed("ENVAULT_")
        .filter(|key| key.as_str() != "crypto_master_key")
        .map(|key| {
            let mapped = key
                .as_str()
                .replacen("service_", "service.", 1)
                .replacen("storage_", "storage.", 1)
                .replacen("crypto_", "crypto.", 1)
                .replacen("rotation_", "rotation.", 1);
            mapped.into()
        })
}

/// Merge the master key from the environment as a plain string, if set.
fn with_master_key_env(figment: Figment) -> Figment {
    let key = std::env::var(MASTER_KEY_ENV_VAR)
        .ok()
        .filter(|k| !k.is_empty())
        .or_else(|| {
            std::env::var(LEGACY_MASTER_KEY_ENV_VAR)
                .ok()
                .filter(|k| !k.is_empty())
        });
    match key {
        Some(key) => figment.merge(Serialized::default("crypto.master_key", key)),
        None => figment,
    }
}
