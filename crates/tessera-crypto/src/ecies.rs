//! ECIES-BLS12381G1-ChaCha20-BLAKE3 encryption.
//!
//! Byte-string plaintexts (content identifiers) cannot be encoded as small
//! ElGamal exponents, so they are sealed to the oracle's ElGamal public key
//! with a hybrid scheme sharing the same key pair.
//!
//! ## Algorithm
//!
//! ```text
//! ECIES.Seal(pk, plaintext; r):
//!   1. eph_pk = r * G
//!   2. shared = r * pk
//!   3. enc_key = BLAKE3::derive_key("Tessera v1 ecies-encryption-key",
//!               shared || eph_pk || pk)
//!   4. nonce = BLAKE3::derive_key("Tessera v1 ecies-nonce", shared || eph_pk)[:12]
//!   5. ciphertext = ChaCha20-Poly1305.Encrypt(enc_key, nonce, plaintext, aad=eph_pk)
//!   6. return (eph_pk || ciphertext || tag)
//! ```
//!
//! Points are in 48-byte compressed form.

use ark_bls12_381::{Fr, G1Projective as G1};
use ark_ec::{CurveGroup, Group};
use ark_ff::UniformRand;
use ark_std::ops::Mul;

use crate::blake3::{self, contexts};
use crate::chacha20;
use crate::elgamal::{compress, decompress, PublicKey, SecretKey, POINT_SIZE};
use crate::{CryptoError, Result};

/// Sealed bytes: ephemeral public key + ciphertext + tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedBytes {
    /// Compressed ephemeral public key.
    pub eph_pk: Vec<u8>,
    /// The ciphertext with appended Poly1305 tag.
    pub ciphertext_and_tag: Vec<u8>,
}

impl SealedBytes {
    /// Serialize to bytes: eph_pk || ciphertext || tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.eph_pk.len() + self.ciphertext_and_tag.len());
        out.extend_from_slice(&self.eph_pk);
        out.extend_from_slice(&self.ciphertext_and_tag);
        out
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < POINT_SIZE + chacha20::TAG_SIZE {
            return Err(CryptoError::Ecies("ciphertext too short".into()));
        }
        let (eph_pk, rest) = data.split_at(POINT_SIZE);
        Ok(Self {
            eph_pk: eph_pk.to_vec(),
            ciphertext_and_tag: rest.to_vec(),
        })
    }
}

fn derive_key_and_nonce(
    shared: &[u8],
    eph_pk: &[u8],
    recipient_pk: &[u8],
) -> ([u8; chacha20::KEY_SIZE], [u8; chacha20::NONCE_SIZE]) {
    let key = blake3::derive_key(
        contexts::ECIES_ENCRYPTION_KEY,
        &[shared, eph_pk, recipient_pk].concat(),
    );
    let nonce_full = blake3::derive_key(contexts::ECIES_NONCE, &[shared, eph_pk].concat());
    let mut nonce = [0u8; chacha20::NONCE_SIZE];
    nonce.copy_from_slice(&nonce_full[..chacha20::NONCE_SIZE]);
    (key, nonce)
}

/// Seal `plaintext` to `recipient` with caller-supplied randomness.
pub fn seal_with_randomness(
    recipient: &PublicKey,
    plaintext: &[u8],
    randomness: Fr,
) -> Result<SealedBytes> {
    let eph = G1::generator().mul(randomness);
    let shared = recipient.point.mul(randomness);

    let affine = G1::normalize_batch(&[eph, shared]);
    let eph_pk = compress(&affine[0])?;
    let shared_bytes = compress(&affine[1])?;
    let recipient_bytes = recipient.to_bytes()?;

    let (key, nonce) = derive_key_and_nonce(&shared_bytes, &eph_pk, &recipient_bytes);
    let ciphertext_and_tag = chacha20::encrypt(&key, &nonce, plaintext, &eph_pk)?;

    Ok(SealedBytes {
        eph_pk,
        ciphertext_and_tag,
    })
}

/// Seal `plaintext` to `recipient` with a random ephemeral key.
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<SealedBytes> {
    let mut rng = rand::rngs::OsRng;
    seal_with_randomness(recipient, plaintext, Fr::rand(&mut rng))
}

/// Open sealed bytes with the recipient's secret key.
pub fn open(recipient: &SecretKey, sealed: &SealedBytes) -> Result<Vec<u8>> {
    let eph: G1 = decompress(&sealed.eph_pk)
        .map_err(|e| CryptoError::Ecies(e.to_string()))?
        .into();
    let shared_bytes = compress(&eph.mul(recipient.scalar).into_affine())?;
    let recipient_bytes = recipient.public_key().to_bytes()?;

    let (key, nonce) = derive_key_and_nonce(&shared_bytes, &sealed.eph_pk, &recipient_bytes);
    chacha20::decrypt(&key, &nonce, &sealed.ciphertext_and_tag, &sealed.eph_pk)
}
