// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage seams for the key registry, the rotation orchestrator, and the
//! client state adapter.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped between SQLite and in-memory backends.

pub mod key_store;
pub mod kv_store;
pub mod secret_store;

pub use key_store::{DataKeyStore, RotationLock};
pub use kv_store::KeyValueStore;
pub use secret_store::SecretStore;
