//! ChaCha20-Poly1305 (RFC 8439), the symmetric half of [`crate::ecies`].
//!
//! Every key is freshly derived per sealed content identifier, so the
//! nonce never repeats under one key.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;

use crate::{CryptoError, Result};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

fn cipher(key: &[u8; KEY_SIZE]) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(key.into())
}

/// `ciphertext || tag` for `plaintext`, bound to `aad`.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    cipher(key)
        .encrypt(nonce.into(), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Ecies("AEAD seal failed".into()))
}

/// # Errors
///
/// - [`CryptoError::AeadDecryption`] if the tag does not verify
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    cipher(key)
        .decrypt(nonce.into(), Payload { msg: sealed, aad })
        .map_err(|_| CryptoError::AeadDecryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x42; KEY_SIZE];
    const NONCE: [u8; NONCE_SIZE] = [0x01; NONCE_SIZE];

    #[test]
    fn test_content_id_sealed_with_tag() {
        let sealed = encrypt(&KEY, &NONCE, b"movie-1", b"eph").expect("encrypt");
        assert_eq!(sealed.len(), b"movie-1".len() + TAG_SIZE);
        assert_eq!(
            decrypt(&KEY, &NONCE, &sealed, b"eph").expect("decrypt"),
            b"movie-1"
        );
    }

    #[test]
    fn test_aad_and_body_are_authenticated() {
        let mut sealed = encrypt(&KEY, &NONCE, b"movie-1", b"eph").expect("encrypt");
        assert!(matches!(
            decrypt(&KEY, &NONCE, &sealed, b"other"),
            Err(CryptoError::AeadDecryption)
        ));
        sealed[0] ^= 0xff;
        assert!(decrypt(&KEY, &NONCE, &sealed, b"eph").is_err());
    }
}
