// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Envault.
//!
//! Provides an in-memory implementation of every storage seam, with fault
//! injection, plus fixed key material and record builders.
//!
//! # Components
//!
//! - [`MemoryStore`] - secrets, data keys, rotation lease, and key-value state in memory
//! - [`fixtures`] - test master keys and [`secret_record`]

pub mod fixtures;
pub mod memory_store;

pub use fixtures::{TEST_MASTER_KEY_HEX, ZERO_MASTER_KEY_HEX, secret_record};
pub use memory_store::MemoryStore;
