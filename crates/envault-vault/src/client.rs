// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypt-then-MAC envelope for client-held state.
//!
//! Every write draws a fresh salt and IV, derives an AES-256-CBC key and an
//! HMAC-SHA256 key from the application secret (see [`crate::kdf`]), encrypts
//! with PKCS#7 padding, and MACs `iv || ciphertext`. The persisted value is
//! the JSON envelope `{s, iv, ct, m}`.
//!
//! Reads are best-effort: anything missing, malformed, or failing the MAC
//! yields `None` so the application starts fresh instead of failing.

use std::sync::Arc;

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use envault_config::model::CryptoConfig;
use envault_core::{EnvaultError, KeyValueStore};
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto;
use crate::kdf::{self, DerivedKeys, SALT_LEN};
use crate::state::{AppState, PersistedState};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key-value entry the client state lives under.
pub const STORAGE_KEY: &str = "envault-storage";

/// CBC IV length in bytes.
pub const IV_LEN: usize = 16;

/// The serialized client envelope.
///
/// Missing fields deserialize as empty strings so an incomplete envelope is
/// detected by [`ClientEnvelope::is_complete`] rather than as a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Salt, hex.
    #[serde(default)]
    pub s: String,
    /// IV, hex.
    #[serde(default)]
    pub iv: String,
    /// Ciphertext, base64.
    #[serde(default)]
    pub ct: String,
    /// HMAC-SHA256 over `iv || ct`, hex.
    #[serde(default)]
    pub m: String,
}

impl ClientEnvelope {
    pub fn is_complete(&self) -> bool {
        !(self.s.is_empty() || self.iv.is_empty() || self.ct.is_empty() || self.m.is_empty())
    }
}

/// Encrypts and decrypts client state with keys derived from one
/// application secret.
#[derive(Clone)]
pub struct ClientCipher {
    secret: SecretString,
    iterations: u32,
}

impl std::fmt::Debug for ClientCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCipher")
            .field("secret", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl ClientCipher {
    /// Cipher using the default iteration count.
    pub fn new(secret: SecretString) -> Self {
        Self::with_iterations(secret, kdf::DEFAULT_ITERATIONS)
    }

    pub fn with_iterations(secret: SecretString, iterations: u32) -> Self {
        Self { secret, iterations }
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::with_iterations(
            SecretString::from(config.client_secret.clone()),
            config.pbkdf2_iterations,
        )
    }

    fn derive(&self, salt: &[u8; SALT_LEN]) -> Result<DerivedKeys, EnvaultError> {
        kdf::derive_keys(
            self.secret.expose_secret().as_bytes(),
            salt,
            self.iterations,
        )
    }

    /// Encrypt `plaintext` into a serialized envelope.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EnvaultError> {
        let salt = kdf::generate_salt()?;
        let iv: [u8; IV_LEN] = crypto::random_array()?;
        let keys = self.derive(&salt)?;

        let ciphertext = Aes256CbcEnc::new_from_slices(keys.enc_key.as_ref(), &iv)
            .map_err(|_| EnvaultError::Internal("failed to create AES-256-CBC cipher".into()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mac_key = hmac::Key::new(hmac::HMAC_SHA256, keys.mac_key.as_ref());
        let tag = hmac::sign(&mac_key, &mac_input(&iv, &ciphertext));

        let envelope = ClientEnvelope {
            s: hex::encode(salt),
            iv: hex::encode(iv),
            ct: BASE64.encode(&ciphertext),
            m: hex::encode(tag.as_ref()),
        };
        serde_json::to_string(&envelope)
            .map_err(|e| EnvaultError::Internal(format!("failed to serialize envelope: {e}")))
    }

    /// Decrypt a serialized envelope.
    ///
    /// Returns `None` for empty, truncated, incomplete, or tampered input.
    /// The MAC is checked in constant time before any decryption happens.
    pub fn decrypt(&self, serialized: &str) -> Option<String> {
        match self.try_decrypt(serialized) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                debug!(error = %e, "discarding unreadable client envelope");
                None
            }
        }
    }

    fn try_decrypt(&self, serialized: &str) -> Result<String, EnvaultError> {
        let envelope: ClientEnvelope = serde_json::from_str(serialized)
            .map_err(|e| EnvaultError::FormatInvalid(format!("envelope is not JSON: {e}")))?;
        if !envelope.is_complete() {
            return Err(EnvaultError::FormatInvalid("envelope is missing a field".into()));
        }

        let salt: [u8; SALT_LEN] = decode_hex_array(&envelope.s, "salt")?;
        let iv: [u8; IV_LEN] = decode_hex_array(&envelope.iv, "iv")?;
        let tag = hex::decode(&envelope.m)
            .map_err(|_| EnvaultError::FormatInvalid("mac is not hex".into()))?;
        let ciphertext = BASE64
            .decode(&envelope.ct)
            .map_err(|_| EnvaultError::FormatInvalid("ciphertext is not base64".into()))?;

        let keys = self.derive(&salt)?;
        let mac_key = hmac::Key::new(hmac::HMAC_SHA256, keys.mac_key.as_ref());
        hmac::verify(&mac_key, &mac_input(&iv, &ciphertext), &tag)
            .map_err(|_| EnvaultError::AuthenticationFailed)?;

        let plaintext = Aes256CbcDec::new_from_slices(keys.enc_key.as_ref(), &iv)
            .map_err(|_| EnvaultError::Internal("failed to create AES-256-CBC cipher".into()))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| EnvaultError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| EnvaultError::AuthenticationFailed)
    }

    /// Serialize `value` to JSON and encrypt it.
    pub fn store<T: Serialize>(&self, value: &T) -> Result<String, EnvaultError> {
        let json = serde_json::to_string(value)
            .map_err(|e| EnvaultError::Internal(format!("failed to serialize state: {e}")))?;
        self.encrypt(&json)
    }

    /// Decrypt and parse a value written by [`ClientCipher::store`].
    pub fn load<T: DeserializeOwned>(&self, serialized: &str) -> Option<T> {
        let json = self.decrypt(serialized)?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "discarding client state that failed to parse");
                None
            }
        }
    }
}

fn mac_input(iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(iv.len() + ciphertext.len());
    data.extend_from_slice(iv);
    data.extend_from_slice(ciphertext);
    data
}

fn decode_hex_array<const N: usize>(value: &str, field: &str) -> Result<[u8; N], EnvaultError> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or_else(|| EnvaultError::FormatInvalid(format!("{field} must be {N} hex-encoded bytes")))
}

/// Persists [`PersistedState`] through a [`KeyValueStore`], encrypted.
///
/// Storage backend errors propagate; unreadable stored values read as absent.
pub struct EncryptedStateStorage {
    store: Arc<dyn KeyValueStore>,
    cipher: ClientCipher,
}

impl EncryptedStateStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, cipher: ClientCipher) -> Self {
        Self { store, cipher }
    }

    pub async fn get_item(&self, name: &str) -> Result<Option<PersistedState>, EnvaultError> {
        let Some(raw) = self.store.get_item(name).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(self.cipher.load(&raw))
    }

    pub async fn set_item(&self, name: &str, value: &PersistedState) -> Result<(), EnvaultError> {
        let sealed = self.cipher.store(value)?;
        self.store.set_item(name, &sealed).await
    }

    pub async fn remove_item(&self, name: &str) -> Result<(), EnvaultError> {
        self.store.remove_item(name).await
    }

    /// Load the application state, or the empty state if none is readable.
    pub async fn load_state(&self) -> Result<AppState, EnvaultError> {
        Ok(self
            .get_item(STORAGE_KEY)
            .await?
            .map(|persisted| persisted.state)
            .unwrap_or_default())
    }

    /// Replace the stored application state.
    pub async fn save_state(&self, state: &AppState) -> Result<(), EnvaultError> {
        self.set_item(STORAGE_KEY, &PersistedState::new(state.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AuthProvider, User};
    use envault_test_utils::MemoryStore;
    use proptest::prelude::*;

    fn cipher() -> ClientCipher {
        ClientCipher::with_iterations(SecretString::from("test-app-secret"), 10)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let c = cipher();
        let sealed = c.encrypt("{\"hello\":\"world\"}").unwrap();
        assert_eq!(c.decrypt(&sealed).as_deref(), Some("{\"hello\":\"world\"}"));
    }

    #[test]
    fn envelope_fields_have_expected_encodings() {
        let sealed = cipher().encrypt("abc").unwrap();
        let env: ClientEnvelope = serde_json::from_str(&sealed).unwrap();
        assert_eq!(env.s.len(), 32);
        assert_eq!(env.iv.len(), 32);
        assert_eq!(env.m.len(), 64);
        assert_eq!(BASE64.decode(&env.ct).unwrap().len(), 16);
    }

    #[test]
    fn repeated_writes_never_repeat() {
        let c = cipher();
        let a = c.encrypt("same").unwrap();
        let b = c.encrypt("same").unwrap();
        let ea: ClientEnvelope = serde_json::from_str(&a).unwrap();
        let eb: ClientEnvelope = serde_json::from_str(&b).unwrap();
        assert_ne!(ea.s, eb.s);
        assert_ne!(ea.iv, eb.iv);
        assert_ne!(ea.ct, eb.ct);
    }

    #[test]
    fn unreadable_input_is_none() {
        let c = cipher();
        assert!(c.decrypt("").is_none());
        assert!(c.decrypt("{\"s\":\"00\",\"iv\":").is_none());
        assert!(c.decrypt("{\"s\":\"00\",\"iv\":\"00\",\"ct\":\"AA==\"}").is_none());
        assert!(c.decrypt("not json at all").is_none());
    }

    #[test]
    fn wrong_mac_is_none() {
        let c = cipher();
        let mut env: ClientEnvelope = serde_json::from_str(&c.encrypt("payload").unwrap()).unwrap();
        env.m = "ab".repeat(32);
        assert!(c.decrypt(&serde_json::to_string(&env).unwrap()).is_none());
    }

    #[test]
    fn different_secret_cannot_read() {
        let sealed = cipher().encrypt("payload").unwrap();
        let other = ClientCipher::with_iterations(SecretString::from("other"), 10);
        assert!(other.decrypt(&sealed).is_none());
    }

    #[test]
    fn default_iteration_count_roundtrips() {
        let c = ClientCipher::new(SecretString::from("envault-secure-storage-key-v1"));
        let sealed = c.encrypt("slow path").unwrap();
        assert_eq!(c.decrypt(&sealed).as_deref(), Some("slow path"));
    }

    #[test]
    fn store_and_load_typed_state() {
        let c = cipher();
        let mut state = AppState::default();
        state.login(User {
            first_name: "Bo".into(),
            last_name: "Li".into(),
            username: "bo".into(),
            email: "bo@example.com".into(),
            avatar: Some("https://example.com/a.png".into()),
            auth_provider: AuthProvider::Google,
        });
        let sealed = c.store(&PersistedState::new(state.clone())).unwrap();
        let loaded: PersistedState = c.load(&sealed).unwrap();
        assert_eq!(loaded.state, state);

        // Valid envelope, wrong shape.
        let sealed = c.encrypt("[1,2,3]").unwrap();
        assert!(c.load::<PersistedState>(&sealed).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn tampering_any_field_bit_is_rejected(field in 0usize..3, bit in any::<proptest::sample::Index>()) {
            let c = cipher();
            let mut env: ClientEnvelope =
                serde_json::from_str(&c.encrypt("tamper target").unwrap()).unwrap();
            match field {
                0 => {
                    let mut iv = hex::decode(&env.iv).unwrap();
                    let b = bit.index(iv.len() * 8);
                    iv[b / 8] ^= 1 << (b % 8);
                    env.iv = hex::encode(iv);
                }
                1 => {
                    let mut ct = BASE64.decode(&env.ct).unwrap();
                    let b = bit.index(ct.len() * 8);
                    ct[b / 8] ^= 1 << (b % 8);
                    env.ct = BASE64.encode(ct);
                }
                _ => {
                    let mut m = hex::decode(&env.m).unwrap();
                    let b = bit.index(m.len() * 8);
                    m[b / 8] ^= 1 << (b % 8);
                    env.m = hex::encode(m);
                }
            }
            let tampered = serde_json::to_string(&env).unwrap();
            prop_assert!(c.decrypt(&tampered).is_none());
            prop_assert!(matches!(c.try_decrypt(&tampered), Err(EnvaultError::AuthenticationFailed)));
        }
    }

    #[tokio::test]
    async fn state_storage_roundtrip_through_kv_store() {
        let kv = Arc::new(MemoryStore::new());
        let storage = EncryptedStateStorage::new(kv.clone(), cipher());

        assert_eq!(storage.load_state().await.unwrap(), AppState::default());

        let mut state = AppState::default();
        state.add_project("api", "backend services");
        storage.save_state(&state).await.unwrap();

        let raw = kv.get_item(STORAGE_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("backend services"));
        assert_eq!(storage.load_state().await.unwrap(), state);

        let persisted = storage.get_item(STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(persisted.version, 0);

        storage.remove_item(STORAGE_KEY).await.unwrap();
        assert!(storage.get_item(STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_stored_state_reads_as_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set_item(STORAGE_KEY, "{\"s\":\"garbage\"}").await.unwrap();
        let storage = EncryptedStateStorage::new(kv, cipher());
        assert!(storage.get_item(STORAGE_KEY).await.unwrap().is_none());
        assert_eq!(storage.load_state().await.unwrap(), AppState::default());
    }
}
