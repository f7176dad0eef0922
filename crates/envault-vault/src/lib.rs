// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope encryption and key rotation for Envault.
//!
//! Two schemes live here:
//!
//! - The client scheme ([`client`]) protects the locally persisted state blob
//!   with AES-256-CBC plus HMAC-SHA256 under PBKDF2-derived keys.
//! - The server scheme ([`codec`], [`registry`], [`rotation`]) seals each
//!   secret with AES-256-GCM under a data key, wraps data keys under the
//!   master key, and rotates data keys online.

pub mod client;
pub mod codec;
pub mod crypto;
pub mod kdf;
pub mod master_key;
pub mod record;
pub mod registry;
pub mod rotation;
pub mod service;
pub mod state;

pub use client::{ClientCipher, ClientEnvelope, EncryptedStateStorage, STORAGE_KEY};
pub use codec::{SecretCiphertext, decrypt_secret, encrypt_secret};
pub use master_key::MasterKey;
pub use record::RecordCipher;
pub use registry::KeyRegistry;
pub use rotation::{RotationOrchestrator, RotationPhase, RotationReport};
pub use service::{RevealedSecret, SecretService, mask_secret};
pub use state::{AppState, PersistedState};
