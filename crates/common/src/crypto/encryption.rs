//! AES-256-GCM sealing of the persisted cache document
//!
//! The encrypted file store writes a single text envelope: base64 over a
//! small JSON object carrying a format version, the nonce and the
//! ciphertext. A fresh random nonce is drawn for every seal.
//!
//! ```rust
//! use tokencache_common::crypto::encryption::EncryptionService;
//!
//! let service = EncryptionService::new(EncryptionService::generate_key())?;
//! let envelope = service.encrypt_to_string(b"{\"AccessToken\":{}}")?;
//! assert_eq!(service.decrypt_from_string(&envelope)?, b"{\"AccessToken\":{}}");
//! # Ok::<(), tokencache_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Envelope format written by this version
const ENVELOPE_VERSION: u8 = 1;
pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Sealed cache document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    #[serde(rename = "v")]
    pub version: u8,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Text form stored on disk.
    pub fn encode(&self) -> CommonResult<String> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }

    pub fn decode(envelope: &str) -> CommonResult<Self> {
        let raw = BASE64
            .decode(envelope.trim())
            .map_err(|e| CommonError::malformed("base64", e.to_string()))?;
        let data: Self = serde_json::from_slice(&raw)?;
        if data.version != ENVELOPE_VERSION {
            return Err(CommonError::malformed(
                "envelope",
                format!("unsupported version {}", data.version),
            ));
        }
        Ok(data)
    }
}

/// Seals and opens cache documents with one fixed key.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// # Errors
    /// `CommonError::InvalidInput` unless `key` is exactly 32 bytes.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::invalid_input(
                "key",
                format!("expected {KEY_LEN} bytes, got {}", key.len()),
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::internal(format!("cipher setup: {e}")))?;
        Ok(Self { cipher })
    }

    /// Random key suitable for [`EncryptionService::new`].
    #[must_use]
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> CommonResult<EncryptedData> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext)
            .map_err(|e| CommonError::crypto("encrypt", e.to_string()))?;
        Ok(EncryptedData { version: ENVELOPE_VERSION, nonce: nonce.to_vec(), ciphertext })
    }

    /// # Errors
    /// `CommonError::Crypto` when the key is wrong or the payload was
    /// tampered with.
    pub fn decrypt(&self, sealed: &EncryptedData) -> CommonResult<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = sealed
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| CommonError::malformed("envelope", "nonce must be 12 bytes"))?;
        self.cipher
            .decrypt(&Nonce::from(nonce), sealed.ciphertext.as_slice())
            .map_err(|e| CommonError::crypto("decrypt", e.to_string()))
    }

    pub fn encrypt_to_string(&self, plaintext: &[u8]) -> CommonResult<String> {
        self.encrypt(plaintext)?.encode()
    }

    pub fn decrypt_from_string(&self, envelope: &str) -> CommonResult<Vec<u8>> {
        self.decrypt(&EncryptedData::decode(envelope)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EncryptionService {
        EncryptionService::new(EncryptionService::generate_key()).unwrap()
    }

    /// Validates `EncryptionService::new` key length checks.
    ///
    /// Assertions:
    /// - A 16-byte key is rejected as invalid input.
    #[test]
    fn rejects_short_key() {
        let err = EncryptionService::new(vec![0; 16]).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    /// Validates sealing through the text envelope.
    ///
    /// Assertions:
    /// - The envelope does not contain the plaintext.
    /// - Two seals of the same input differ (fresh nonce).
    /// - Opening returns the plaintext.
    #[test]
    fn envelope_hides_plaintext() {
        let service = service();
        let first = service.encrypt_to_string(b"refresh-token-secret").unwrap();
        let second = service.encrypt_to_string(b"refresh-token-secret").unwrap();

        assert!(!first.contains("refresh-token-secret"));
        assert_ne!(first, second);
        assert_eq!(service.decrypt_from_string(&first).unwrap(), b"refresh-token-secret");
    }

    #[test]
    fn wrong_key_is_a_crypto_error() {
        let sealed = service().encrypt(b"payload").unwrap();
        let err = service().decrypt(&sealed).unwrap_err();
        assert!(matches!(err, CommonError::Crypto { operation: "decrypt", .. }));
    }

    /// Validates `EncryptedData::decode` on foreign input.
    ///
    /// Assertions:
    /// - Non-base64 text is malformed.
    /// - An envelope with an unknown version is malformed.
    #[test]
    fn decode_rejects_foreign_input() {
        assert_eq!(EncryptedData::decode("not base64 !!").unwrap_err().kind(), "malformed");

        let future = EncryptedData { version: 9, nonce: vec![0; 12], ciphertext: vec![1] };
        let err = EncryptedData::decode(&future.encode().unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported version 9"));
    }
}
