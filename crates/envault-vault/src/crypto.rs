// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] draws a fresh random 128-bit nonce from the system
//! CSPRNG. Nonce reuse under one key would be catastrophic for GCM security.
//!
//! The sealed form is `nonce(16) || ciphertext || tag(16)`. A 16-byte nonce is
//! outside what `ring` supports, so the AEAD itself comes from `aes-gcm`.

use aes_gcm::AesGcm;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use envault_core::EnvaultError;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// AES-256-GCM with a 128-bit nonce and 128-bit tag.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Raw AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes.
pub const NONCE_LEN: usize = 16;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key` with a random nonce.
///
/// Returns `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, EnvaultError> {
    let cipher = Aes256Gcm128::new_from_slice(key)
        .map_err(|_| EnvaultError::Internal("failed to create AES-256-GCM key".to_string()))?;

    let nonce_bytes: [u8; NONCE_LEN] = random_array()?;
    let nonce = GenericArray::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EnvaultError::Internal("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt `nonce || ciphertext || tag` produced by [`seal`].
///
/// Input shorter than a nonce plus a tag is `FormatInvalid`. Every other
/// failure (wrong key, flipped bit) is the opaque `AuthenticationFailed`.
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>, EnvaultError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(EnvaultError::FormatInvalid(format!(
            "sealed payload is {} bytes, need at least {}",
            sealed.len(),
            NONCE_LEN + TAG_LEN
        )));
    }
    let cipher = Aes256Gcm128::new_from_slice(key)
        .map_err(|_| EnvaultError::Internal("failed to create AES-256-GCM key".to_string()))?;

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(GenericArray::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| EnvaultError::AuthenticationFailed)
}

/// Generate a random 32-byte key suitable for AES-256.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_LEN]>, EnvaultError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    fill_random(key.as_mut())?;
    Ok(key)
}

/// Fill `buf` from the system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<(), EnvaultError> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| EnvaultError::Internal("system random number generator failed".to_string()))
}

/// A fixed-size array of random bytes.
pub fn random_array<const N: usize>() -> Result<[u8; N], EnvaultError> {
    let mut out = [0u8; N];
    fill_random(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let plaintext = b"secret api key value";

        let sealed = seal(&key, plaintext).unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), plaintext);
    }

    #[test]
    fn sealed_layout_is_nonce_ciphertext_tag() {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, b"hello").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 5 + TAG_LEN);
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, b"").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + TAG_LEN);
        assert!(open(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let key = generate_random_key().unwrap();
        let a = seal(&key, b"same input twice").unwrap();
        let b = seal(&key, b"same input twice").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_is_authentication_failure() {
        let key1 = generate_random_key().unwrap();
        let key2 = generate_random_key().unwrap();
        let sealed = seal(&key1, b"secret data").unwrap();
        assert!(matches!(
            open(&key2, &sealed),
            Err(EnvaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn short_input_is_format_invalid() {
        let key = generate_random_key().unwrap();
        assert!(matches!(
            open(&key, &[0u8; NONCE_LEN + TAG_LEN - 1]),
            Err(EnvaultError::FormatInvalid(_))
        ));
    }

    #[test]
    fn random_keys_differ() {
        let a = generate_random_key().unwrap();
        let b = generate_random_key().unwrap();
        assert_ne!(*a, *b);
    }

    proptest! {
        #[test]
        fn any_single_bit_flip_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 1..128),
            bit in any::<proptest::sample::Index>(),
        ) {
            let key = [7u8; KEY_LEN];
            let mut sealed = seal(&key, &plaintext).unwrap();
            let bit = bit.index(sealed.len() * 8);
            sealed[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(matches!(open(&key, &sealed), Err(EnvaultError::AuthenticationFailed)));
        }
    }
}
