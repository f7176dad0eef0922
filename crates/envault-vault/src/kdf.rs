// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 derivation of the client envelope's key pair.
//!
//! One 512-bit derivation is split into two 256-bit halves: the first keys
//! AES-256-CBC, the second keys HMAC-SHA256. Both halves are independent
//! because PBKDF2 output bits are indistinguishable from random.
//!
//! The input secret is a long-lived, low-entropy value shipped with the
//! application. It exists so every write gets a fresh key pair from a fresh
//! salt. It does not make the blob confidential against anyone who can run
//! code on the client; it protects a local, client-controlled blob from
//! casual inspection and tampering.

use std::num::NonZeroU32;

use envault_core::EnvaultError;
use ring::pbkdf2;
use zeroize::Zeroizing;

use crate::crypto;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Default iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// The encryption and MAC keys derived from one salt.
pub struct DerivedKeys {
    pub enc_key: Zeroizing<[u8; 32]>,
    pub mac_key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("enc_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the key pair for `secret` and `salt`.
///
/// `iterations` of zero is a configuration error.
pub fn derive_keys(
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    iterations: u32,
) -> Result<DerivedKeys, EnvaultError> {
    let iterations = NonZeroU32::new(iterations).ok_or_else(|| {
        EnvaultError::ConfigurationInvalid("PBKDF2 iteration count must be non-zero".to_string())
    })?;

    let mut output = Zeroizing::new([0u8; 64]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        secret,
        output.as_mut(),
    );

    let mut enc_key = Zeroizing::new([0u8; 32]);
    let mut mac_key = Zeroizing::new([0u8; 32]);
    enc_key.copy_from_slice(&output[..32]);
    mac_key.copy_from_slice(&output[32..]);
    Ok(DerivedKeys { enc_key, mac_key })
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], EnvaultError> {
    crypto::random_array()
}
