//! Encryption-at-rest layer for Muster.
//!
//! Everything the local cache persists is sealed with ChaCha20-Poly1305
//! before it reaches disk. Keys are derived from the user's passphrase with
//! Argon2id and zeroized on drop; they exist only for the lifetime of a
//! session and are never written anywhere.
//!
//! Cached rows and queued writes live in TEXT columns, so ciphertext is
//! framed as `base64(nonce || ciphertext || tag)` via [`encrypt_string`] /
//! [`decrypt_string`]. A failed decrypt means a wrong key or a tampered
//! blob; callers treat the cache entry as unusable and fall back to the
//! remote copy.

mod cipher;
mod error;
mod key;

pub use cipher::{
    decrypt, decrypt_string, encrypt, encrypt_string, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, generate_random_key, DerivedKey, KdfParams, Salt, KEY_SIZE, SALT_SIZE};
