use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;

use crate::error::AppError;

const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher over the server-held master key.
///
/// Wire format for a stored entry: base64(nonce || ciphertext+tag), one fresh
/// 96-bit nonce per encryption. The key never leaves the process.
#[derive(Clone)]
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl KeyCipher {
    /// Build from the base64-encoded 32-byte master key in config.
    pub fn from_master_key(encoded: &str) -> Result<Self, AppError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AppError::Internal("VAULT_MASTER_KEY is not valid base64".to_string()))?;

        if bytes.len() != 32 {
            return Err(AppError::Internal(
                "VAULT_MASTER_KEY must decode to exactly 32 bytes".to_string(),
            ));
        }

        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AppError::Internal("Vault encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, AppError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AppError::Internal("Stored ciphertext is corrupt".to_string()))?;

        if raw.len() <= NONCE_LEN {
            return Err(AppError::Internal("Stored ciphertext is truncated".to_string()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::Internal("Vault decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Internal("Decrypted key is not UTF-8".to_string()))
    }
}
