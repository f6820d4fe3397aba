//! ChaCha20-Poly1305 authenticated encryption plus the base64 framing used
//! for TEXT columns.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext plus the nonce it was sealed under. The auth tag is appended
/// to the ciphertext by the AEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts plaintext under a fresh random nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(EncryptedData {
        nonce: nonce.into(),
        ciphertext,
    })
}

/// Decrypts and authenticates. Fails on a wrong key or any tampering.
pub fn decrypt(key: &DerivedKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_ref())
        .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))
}

/// Encrypts to the string framing stored in TEXT columns:
/// `base64(nonce || ciphertext || tag)`.
pub fn encrypt_string(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<String> {
    let data = encrypt(key, plaintext)?;
    let mut framed = Vec::with_capacity(NONCE_SIZE + data.ciphertext.len());
    framed.extend_from_slice(&data.nonce);
    framed.extend_from_slice(&data.ciphertext);
    Ok(BASE64.encode(framed))
}

/// Decrypts the string framing produced by [`encrypt_string`].
pub fn decrypt_string(key: &DerivedKey, blob: &str) -> CryptoResult<Vec<u8>> {
    let framed = BASE64
        .decode(blob)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    if framed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption("blob too short".to_string()));
    }
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&framed[..NONCE_SIZE]);
    decrypt(
        key,
        &EncryptedData {
            nonce,
            ciphertext: framed[NONCE_SIZE..].to_vec(),
        },
    )
}
