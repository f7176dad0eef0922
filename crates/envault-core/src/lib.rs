// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Envault.
//!
//! This crate provides the error taxonomy, the domain types shared by the
//! encryption layer and the persistence layer, and the async storage traits
//! that the key registry and rotation orchestrator are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EnvaultError;
pub use types::{DataKey, KeyStatus, SecretFilter, SecretRecord};

// Re-export all storage traits at crate root.
pub use traits::{DataKeyStore, KeyValueStore, RotationLock, SecretStore};
