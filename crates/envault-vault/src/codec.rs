// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side secret encoding.
//!
//! The wire string is `base64(nonce || ciphertext || tag)`. A stored record
//! value is either a bare wire string (legacy, sealed under the master key)
//! or `v1:<key_id>:<wire>` (sealed under data key `key_id`).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use envault_core::EnvaultError;

use crate::crypto::{self, KEY_LEN};

/// Prefix of wrapped-format record values.
pub const V1_PREFIX: &str = "v1:";

/// Encrypt `plaintext` under `key` into a wire string.
pub fn encrypt_secret(plaintext: &str, key: &[u8; KEY_LEN]) -> Result<String, EnvaultError> {
    Ok(BASE64.encode(crypto::seal(key, plaintext.as_bytes())?))
}

/// Decrypt a wire string produced by [`encrypt_secret`].
pub fn decrypt_secret(wire: &str, key: &[u8; KEY_LEN]) -> Result<String, EnvaultError> {
    open_utf8(&decode_wire(wire)?, key)
}

fn decode_wire(wire: &str) -> Result<Vec<u8>, EnvaultError> {
    BASE64
        .decode(wire.trim())
        .map_err(|_| EnvaultError::FormatInvalid("secret wire string is not valid base64".into()))
}

fn open_utf8(sealed: &[u8], key: &[u8; KEY_LEN]) -> Result<String, EnvaultError> {
    let plaintext = crypto::open(key, sealed)?;
    String::from_utf8(plaintext)
        .map_err(|_| EnvaultError::FormatInvalid("decrypted secret is not UTF-8".into()))
}

/// A parsed record value: which key it needs and the sealed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretCiphertext {
    /// Sealed directly under the master key.
    Legacy { sealed: Vec<u8> },
    /// Sealed under the data key `key_id`.
    Wrapped { key_id: String, sealed: Vec<u8> },
}

impl SecretCiphertext {
    /// Parse a stored value on its own.
    pub fn parse(value: &str) -> Result<Self, EnvaultError> {
        match value.strip_prefix(V1_PREFIX) {
            Some(rest) => {
                let (key_id, wire) = rest.split_once(':').ok_or_else(|| {
                    EnvaultError::FormatInvalid("v1 value is missing its key id separator".into())
                })?;
                if key_id.is_empty() {
                    return Err(EnvaultError::FormatInvalid("v1 value has an empty key id".into()));
                }
                Ok(Self::Wrapped {
                    key_id: key_id.to_string(),
                    sealed: decode_wire(wire)?,
                })
            }
            None => Ok(Self::Legacy {
                sealed: decode_wire(value)?,
            }),
        }
    }

    /// Parse a stored value together with its row's `key_id` column.
    ///
    /// A `v1:` value must agree with the column when the column is set. A
    /// bare value on a row that has a key id is read as sealed under that key.
    pub fn from_record(value: &str, key_id: Option<&str>) -> Result<Self, EnvaultError> {
        match (Self::parse(value)?, key_id) {
            (Self::Wrapped { key_id: embedded, .. }, Some(column)) if embedded != column => {
                Err(EnvaultError::FormatInvalid(format!(
                    "value names key {embedded} but the record references key {column}"
                )))
            }
            (Self::Legacy { sealed }, Some(column)) => Ok(Self::Wrapped {
                key_id: column.to_string(),
                sealed,
            }),
            (parsed, _) => Ok(parsed),
        }
    }

    /// Seal `plaintext` under data key `key_id`.
    pub fn wrap(key_id: &str, plaintext: &str, key: &[u8; KEY_LEN]) -> Result<Self, EnvaultError> {
        Ok(Self::Wrapped {
            key_id: key_id.to_string(),
            sealed: crypto::seal(key, plaintext.as_bytes())?,
        })
    }

    /// Seal `plaintext` directly under the master key.
    pub fn legacy(plaintext: &str, master_key: &[u8; KEY_LEN]) -> Result<Self, EnvaultError> {
        Ok(Self::Legacy {
            sealed: crypto::seal(master_key, plaintext.as_bytes())?,
        })
    }

    /// The data key this value needs, or `None` for the master key.
    pub fn key_id(&self) -> Option<&str> {
        match self {
            Self::Legacy { .. } => None,
            Self::Wrapped { key_id, .. } => Some(key_id),
        }
    }

    /// Decrypt with the key this value needs.
    pub fn open(&self, key: &[u8; KEY_LEN]) -> Result<String, EnvaultError> {
        match self {
            Self::Legacy { sealed } | Self::Wrapped { sealed, .. } => open_utf8(sealed, key),
        }
    }

    /// The string stored in the record's `value` column.
    pub fn to_record_value(&self) -> String {
        match self {
            Self::Legacy { sealed } => BASE64.encode(sealed),
            Self::Wrapped { key_id, sealed } => {
                format!("{V1_PREFIX}{key_id}:{}", BASE64.encode(sealed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: [u8; KEY_LEN] = [0x11; KEY_LEN];
    const OTHER: [u8; KEY_LEN] = [0x22; KEY_LEN];

    #[test]
    fn wire_roundtrip() {
        let wire = encrypt_secret("hunter2", &KEY).unwrap();
        assert_eq!(decrypt_secret(&wire, &KEY).unwrap(), "hunter2");
    }

    #[test]
    fn wire_is_plain_base64_with_nonce_and_tag() {
        let wire = encrypt_secret("abc", &KEY).unwrap();
        let raw = BASE64.decode(&wire).unwrap();
        assert_eq!(raw.len(), crypto::NONCE_LEN + 3 + crypto::TAG_LEN);
        assert!(!wire.starts_with('{'));
    }

    #[test]
    fn wrong_key_is_authentication_failure() {
        let wire = encrypt_secret("abc", &KEY).unwrap();
        assert!(matches!(
            decrypt_secret(&wire, &OTHER),
            Err(EnvaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn bad_base64_and_short_input_are_format_invalid() {
        assert!(matches!(
            decrypt_secret("not base64!!", &KEY),
            Err(EnvaultError::FormatInvalid(_))
        ));
        let short = BASE64.encode([0u8; 31]);
        assert!(matches!(
            decrypt_secret(&short, &KEY),
            Err(EnvaultError::FormatInvalid(_))
        ));
    }

    #[test]
    fn parse_wrapped_value() {
        let value = SecretCiphertext::wrap("k-1", "s3cret", &KEY)
            .unwrap()
            .to_record_value();
        assert!(value.starts_with("v1:k-1:"));

        let parsed = SecretCiphertext::parse(&value).unwrap();
        assert_eq!(parsed.key_id(), Some("k-1"));
        assert_eq!(parsed.open(&KEY).unwrap(), "s3cret");
    }

    #[test]
    fn parse_legacy_value() {
        let wire = encrypt_secret("old", &KEY).unwrap();
        let parsed = SecretCiphertext::parse(&wire).unwrap();
        assert_eq!(parsed.key_id(), None);
        assert_eq!(parsed.to_record_value(), wire);
        assert_eq!(parsed.open(&KEY).unwrap(), "old");
    }

    #[test]
    fn malformed_v1_values() {
        assert!(matches!(
            SecretCiphertext::parse("v1:no-separator"),
            Err(EnvaultError::FormatInvalid(_))
        ));
        assert!(matches!(
            SecretCiphertext::parse("v1::AAAA"),
            Err(EnvaultError::FormatInvalid(_))
        ));
        assert!(matches!(
            SecretCiphertext::parse("v1:k:***"),
            Err(EnvaultError::FormatInvalid(_))
        ));
    }

    #[test]
    fn from_record_checks_key_id_column() {
        let value = SecretCiphertext::wrap("k1", "x", &KEY)
            .unwrap()
            .to_record_value();
        assert!(SecretCiphertext::from_record(&value, Some("k1")).is_ok());
        assert!(SecretCiphertext::from_record(&value, None).is_ok());
        assert!(matches!(
            SecretCiphertext::from_record(&value, Some("k2")),
            Err(EnvaultError::FormatInvalid(_))
        ));
    }

    #[test]
    fn bare_value_with_key_id_reads_as_wrapped() {
        let wire = encrypt_secret("x", &KEY).unwrap();
        let parsed = SecretCiphertext::from_record(&wire, Some("k7")).unwrap();
        assert_eq!(parsed.key_id(), Some("k7"));
        assert_eq!(parsed.open(&KEY).unwrap(), "x");
        assert_eq!(
            SecretCiphertext::from_record(&wire, None).unwrap().key_id(),
            None
        );
    }

    proptest! {
        #[test]
        fn any_bit_flip_in_wire_fails_authentication(
            plaintext in "[ -~]{1,64}",
            bit in any::<proptest::sample::Index>(),
        ) {
            let wire = encrypt_secret(&plaintext, &KEY).unwrap();
            let mut raw = BASE64.decode(&wire).unwrap();
            let bit = bit.index(raw.len() * 8);
            raw[bit / 8] ^= 1 << (bit % 8);
            let tampered = BASE64.encode(raw);
            prop_assert!(matches!(
                decrypt_secret(&tampered, &KEY),
                Err(EnvaultError::AuthenticationFailed)
            ));
        }

        #[test]
        fn roundtrips_arbitrary_utf8(plaintext in "\\PC{0,64}") {
            let wire = encrypt_secret(&plaintext, &KEY).unwrap();
            prop_assert_eq!(decrypt_secret(&wire, &KEY).unwrap(), plaintext);
        }
    }
}
