//! Encryption at rest for single credential fields.
//!
//! AES-256-GCM under a per-field key derived from the process master key
//! with HKDF-SHA256 (info = field name), so a blob sealed for one field
//! cannot be opened under another field's context. Blobs serialize to one
//! opaque JSON string so callers can store them in plain TEXT columns.

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error as ThisError;

/// Size of the AES-256 key in bytes. The master key must be at least this
/// long.
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes.
const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag.
const TAG_SIZE: usize = 16;

/// Current blob layout version.
const BLOB_VERSION: u8 = 1;

#[derive(Debug, ThisError)]
pub enum VaultError {
    #[error("vault master key must be at least {KEY_SIZE} bytes")]
    MasterKeyTooShort,

    #[error("key derivation failed for field {0}")]
    KeyDerivation(String),

    #[error("encryption failed for field {0}")]
    EncryptionFailed(String),

    #[error("ciphertext for field {0} failed authentication")]
    Tampered(String),
}

/// Serialized form of an encrypted credential field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub data: String,
    pub iv: String,
    pub tag: String,
    pub version: u8,
    pub encrypted_at: DateTime<Utc>,
}

/// Stateless encrypt/decrypt transform for named credential fields.
pub struct SecretVault {
    master_key: String,
}

impl SecretVault {
    pub fn new(master_key: impl Into<String>) -> Result<Self, VaultError> {
        let master_key = master_key.into();
        if master_key.len() < KEY_SIZE {
            return Err(VaultError::MasterKeyTooShort);
        }
        Ok(Self { master_key })
    }

    /// Seals `plaintext` for `field` and returns the blob as one opaque
    /// JSON string.
    pub fn encrypt(&self, field: &str, plaintext: &str) -> Result<String, VaultError> {
        let cipher = self.cipher_for(field)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed(field.to_string()))?;

        // AEAD output is ciphertext || tag; the blob stores them separately.
        let (data, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        let blob = EncryptedBlob {
            data: BASE64.encode(data),
            iv: BASE64.encode(nonce),
            tag: BASE64.encode(tag),
            version: BLOB_VERSION,
            encrypted_at: Utc::now(),
        };

        serde_json::to_string(&blob).map_err(|_| VaultError::EncryptionFailed(field.to_string()))
    }

    /// Opens a value produced by [`SecretVault::encrypt`].
    ///
    /// Anything that does not structurally parse as a blob is returned
    /// unchanged: values stored before encryption was introduced must keep
    /// flowing through decrypt. A structurally valid blob whose tag fails
    /// verification is an error; callers must not rely on decrypt to
    /// validate input integrity beyond that.
    pub fn decrypt(&self, field: &str, value: &str) -> Result<String, VaultError> {
        let Some((data, iv, tag)) = parse_blob(value) else {
            return Ok(value.to_string());
        };

        let cipher = self.cipher_for(field)?;

        let mut sealed = data;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| VaultError::Tampered(field.to_string()))?;

        String::from_utf8(plaintext).map_err(|_| VaultError::Tampered(field.to_string()))
    }

    fn cipher_for(&self, field: &str) -> Result<Aes256Gcm, VaultError> {
        let hk = Hkdf::<Sha256>::new(None, self.master_key.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        hk.expand(field.as_bytes(), &mut key)
            .map_err(|_| VaultError::KeyDerivation(field.to_string()))?;

        Aes256Gcm::new_from_slice(&key).map_err(|_| VaultError::KeyDerivation(field.to_string()))
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Structural parse of a stored value. `None` means "not a blob", which the
/// caller passes through as plaintext.
fn parse_blob(value: &str) -> Option<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let blob: EncryptedBlob = serde_json::from_str(value).ok()?;
    if blob.version != BLOB_VERSION {
        return None;
    }
    let data = BASE64.decode(blob.data).ok()?;
    let iv = BASE64.decode(blob.iv).ok()?;
    let tag = BASE64.decode(blob.tag).ok()?;
    (iv.len() == IV_SIZE && tag.len() == TAG_SIZE).then_some((data, iv, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vault() -> SecretVault {
        SecretVault::new("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let vault = test_vault();
        let sealed = vault.encrypt("pool_api_key", "pk_live_12345").unwrap();

        assert_ne!(sealed, "pk_live_12345");
        let opened = vault.decrypt("pool_api_key", &sealed).unwrap();
        assert_eq!(opened, "pk_live_12345");
    }

    #[test]
    fn same_plaintext_different_ciphertext() {
        let vault = test_vault();
        let a = vault.encrypt("pool_api_key", "same").unwrap();
        let b = vault.encrypt("pool_api_key", "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn field_context_is_isolated() {
        let vault = test_vault();
        let sealed = vault.encrypt("pool_api_key", "secret").unwrap();

        let result = vault.decrypt("github_token", &sealed);
        assert!(matches!(result, Err(VaultError::Tampered(_))));
    }

    #[test]
    fn plaintext_passes_through_unchanged() {
        let vault = test_vault();
        assert_eq!(
            vault.decrypt("pool_api_key", "pk_live_plain").unwrap(),
            "pk_live_plain"
        );
    }

    #[test]
    fn malformed_json_passes_through_unchanged() {
        let vault = test_vault();
        let garbled = r#"{"data": 1, "iv": true}"#;
        assert_eq!(vault.decrypt("pool_api_key", garbled).unwrap(), garbled);
    }

    #[test]
    fn unknown_version_passes_through_unchanged() {
        let vault = test_vault();
        let sealed = vault.encrypt("pool_api_key", "secret").unwrap();
        let mut blob: EncryptedBlob = serde_json::from_str(&sealed).unwrap();
        blob.version = 99;
        let stale = serde_json::to_string(&blob).unwrap();

        assert_eq!(vault.decrypt("pool_api_key", &stale).unwrap(), stale);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = test_vault();
        let sealed = vault.encrypt("pool_api_key", "secret").unwrap();

        let mut blob: EncryptedBlob = serde_json::from_str(&sealed).unwrap();
        let mut data = BASE64.decode(&blob.data).unwrap();
        data[0] ^= 0xFF;
        blob.data = BASE64.encode(&data);
        let forged = serde_json::to_string(&blob).unwrap();

        let result = vault.decrypt("pool_api_key", &forged);
        assert!(matches!(result, Err(VaultError::Tampered(_))));
    }

    #[test]
    fn short_master_key_is_rejected() {
        assert!(matches!(
            SecretVault::new("tooshort"),
            Err(VaultError::MasterKeyTooShort)
        ));
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let vault = test_vault();
        let sealed = vault.encrypt("pool_api_key", "").unwrap();
        assert_eq!(vault.decrypt("pool_api_key", &sealed).unwrap(), "");
    }
}
