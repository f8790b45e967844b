//! Credential cipher
//!
//! Symmetric encryption of the credentials sub-document carried by snapshots.
//!
//! Blobs use AES-256-CTR with a random 16 byte IV and are stored as
//! `{ "$": <hex iv><base64 ciphertext> }`. The key is always the SHA-256 digest
//! of a secret string, never the secret itself.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

const IV_LEN: usize = 16;
const IV_HEX_LEN: usize = IV_LEN * 2;

/// Errors raised by the credential cipher
#[derive(Debug, Error)]
pub enum CipherError {
    /// The blob does not have the `<hex iv><base64>` shape
    #[error("Malformed credentials blob: {0}")]
    MalformedBlob(String),

    /// Decryption produced something that is not a JSON object.
    /// Almost always a secret mismatch; never worth retrying.
    #[error("Credentials could not be decrypted: secret mismatch or corrupt data")]
    CorruptCredentials,

    /// Plaintext could not be serialised
    #[error("Failed to serialize credentials: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Encrypted credentials document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    #[serde(rename = "$")]
    pub data: String,
}

/// 32 byte AES key derived from a secret string
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialKey([u8; 32]);

impl CredentialKey {
    /// Derive the key as SHA-256 of the UTF-8 secret
    pub fn from_secret(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }
}

impl std::fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialKey(..)")
    }
}

/// Generate a fresh credential secret for a target (64 hex characters)
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Encrypt a credentials object
pub fn encrypt(key: &CredentialKey, plaintext: &Value) -> Result<EncryptedBlob, CipherError> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut buffer = serde_json::to_vec(plaintext)?;
    let mut cipher = Aes256Ctr::new((&key.0).into(), (&iv).into());
    cipher.apply_keystream(&mut buffer);

    Ok(EncryptedBlob {
        data: format!("{}{}", hex::encode(iv), STANDARD.encode(buffer)),
    })
}

/// Decrypt a credentials blob back into its JSON object
pub fn decrypt(key: &CredentialKey, blob: &EncryptedBlob) -> Result<Value, CipherError> {
    if blob.data.len() < IV_HEX_LEN || !blob.data.is_char_boundary(IV_HEX_LEN) {
        return Err(CipherError::MalformedBlob(
            "blob is shorter than its IV".to_string(),
        ));
    }

    let (iv_hex, payload) = blob.data.split_at(IV_HEX_LEN);
    let iv: [u8; IV_LEN] = hex::decode(iv_hex)
        .map_err(|e| CipherError::MalformedBlob(format!("invalid IV: {}", e)))?
        .try_into()
        .map_err(|_| CipherError::MalformedBlob("IV must be 16 bytes".to_string()))?;
    let mut buffer = STANDARD
        .decode(payload)
        .map_err(|e| CipherError::MalformedBlob(format!("invalid ciphertext: {}", e)))?;

    let mut cipher = Aes256Ctr::new((&key.0).into(), (&iv).into());
    cipher.apply_keystream(&mut buffer);

    match serde_json::from_slice::<Value>(&buffer) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(CipherError::CorruptCredentials),
    }
}

/// Credentials handed to [`reencrypt`]
pub enum Sealed<'a> {
    /// A blob encrypted under `key`
    Blob {
        key: &'a CredentialKey,
        blob: &'a EncryptedBlob,
    },
    /// An already decrypted credential object
    Plaintext(&'a Value),
}

/// Move credentials from one key to another.
pub fn reencrypt(input: Sealed<'_>, new_key: &CredentialKey) -> Result<EncryptedBlob, CipherError> {
    match input {
        Sealed::Blob { key, blob } => encrypt(new_key, &decrypt(key, blob)?),
        Sealed::Plaintext(plaintext) => encrypt(new_key, plaintext),
    }
}
