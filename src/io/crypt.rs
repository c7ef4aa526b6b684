//! Package encryption.
//!
//! Bodies are encrypted with AES-256 in CBC mode with PKCS#7 padding. The
//! key is SHA-256(salt ‖ password); a digest of the key is kept in the
//! header so a wrong password is reported instead of producing garbage.

use std::fmt;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use cbc::{Decryptor, Encryptor};
use sha2::{Digest, Sha256};

use crate::error::{LoadError, Result};

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

/// Filter name of password encryption.
pub const STANDARD_FILTER: &str = "Standard";

/// Supplies keys for encrypted packages.
pub trait DecryptionHandler: fmt::Debug {
    /// Encryption filter this handler understands, e.g. "Standard".
    fn filter(&self) -> &str;

    /// Derive the body key for a package salt.
    fn derive_key(&self, salt: &[u8]) -> [u8; 32];

    /// Password to restore into the loaded document's encryption
    /// settings, so it encrypts the same way when rendered again.
    fn password(&self) -> Option<&str> {
        None
    }
}

/// Opens packages encrypted with a password.
#[derive(Clone)]
pub struct PasswordHandler {
    password: String,
}

impl fmt::Debug for PasswordHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHandler").finish_non_exhaustive()
    }
}

impl PasswordHandler {
    /// Create a handler for `password`.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl DecryptionHandler for PasswordHandler {
    fn filter(&self) -> &str {
        STANDARD_FILTER
    }

    fn derive_key(&self, salt: &[u8]) -> [u8; 32] {
        derive_key(salt, &self.password)
    }

    fn password(&self) -> Option<&str> {
        Some(&self.password)
    }
}

pub(crate) fn derive_key(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Digest of a key stored in the header.
pub(crate) fn key_check(key: &[u8; 32]) -> Vec<u8> {
    Sha256::digest(key).to_vec()
}

pub(crate) fn encrypt(key: &[u8; 32], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    let mut padded = data.to_vec();
    let padding_len = 16 - (data.len() % 16);
    padded.extend(std::iter::repeat(padding_len as u8).take(padding_len));

    let len = padded.len();
    Aes256CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut padded, len)
        .map_err(|_| LoadError::Malformed("encryption failed".into()))?;
    Ok(padded)
}

pub(crate) fn decrypt(key: &[u8; 32], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % 16 != 0 {
        return Err(LoadError::Malformed("encrypted body is not a whole number of blocks".into()).into());
    }
    let mut buffer = data.to_vec();
    let decrypted = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buffer)
        .map_err(|_| LoadError::Malformed("decryption failed".into()))?;

    let padding_len = decrypted.last().copied().unwrap_or(0) as usize;
    if padding_len == 0 || padding_len > 16 || padding_len > decrypted.len() {
        return Err(LoadError::Malformed("invalid padding".into()).into());
    }
    let data_len = decrypted.len() - padding_len;
    if decrypted[data_len..].iter().any(|&b| b as usize != padding_len) {
        return Err(LoadError::Malformed("invalid padding".into()).into());
    }
    Ok(decrypted[..data_len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_salt() {
        let handler = PasswordHandler::new("secret");
        assert_eq!(handler.derive_key(b"salt"), derive_key(b"salt", "secret"));
        assert_ne!(handler.derive_key(b"salt"), handler.derive_key(b"pepper"));
    }

    #[test]
    fn test_block_aligned_input_gets_full_padding_block() {
        let key = derive_key(b"s", "pw");
        let iv = [7u8; 16];
        let data = [42u8; 32];
        let encrypted = encrypt(&key, &iv, &data).unwrap();
        assert_eq!(encrypted.len(), 48);
        assert_eq!(decrypt(&key, &iv, &encrypted).unwrap(), data);
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let key = derive_key(b"s", "pw");
        assert!(decrypt(&key, &[0; 16], &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", PasswordHandler::new("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
