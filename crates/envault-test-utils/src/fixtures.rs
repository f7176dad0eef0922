// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed key material and record builders.

use envault_core::SecretRecord;

/// The all-zero master key, 64 hex characters.
pub const ZERO_MASTER_KEY_HEX: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A non-trivial master key for tests that need two distinct keys.
pub const TEST_MASTER_KEY_HEX: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// Build a secret record. An empty `id` lets the store assign one.
pub fn secret_record(
    id: &str,
    user_id: &str,
    name: &str,
    value: &str,
    key_id: Option<&str>,
) -> SecretRecord {
    SecretRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        project_id: None,
        name: name.to_string(),
        value: value.to_string(),
        key_id: key_id.map(str::to_string),
        created_at: String::new(),
        updated_at: String::new(),
    }
}
