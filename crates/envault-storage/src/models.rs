// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types live in `envault-core::types` so the encryption layer
//! can use them without depending on SQLite. Re-exported here for convenience.

pub use envault_core::types::{DataKey, KeyStatus, SecretFilter, SecretRecord};
