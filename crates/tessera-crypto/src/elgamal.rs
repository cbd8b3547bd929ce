//! Exponential ElGamal on BLS12-381 G1.
//!
//! Numeric ciphertexts are additively homomorphic:
//! `Enc(a) + Enc(b) = Enc(a + b)`, computed component-wise without the
//! secret key. This is what lets the ledger fold decrypted sale amounts into
//! a running encrypted total per content identifier.
//!
//! ## Scheme
//!
//! ```text
//! KeyGen:        sk <- Fr,  pk = sk * G
//! Enc(pk, m; r): c1 = r * G,  c2 = m * G + r * pk
//! Add:           (c1 + c1', c2 + c2')
//! Dec(sk, c):    M = c2 - sk * c1 = m * G,  m = dlog_G(M)
//! ```
//!
//! The final discrete log is solved with a baby-step/giant-step table, so
//! decryption only succeeds for plaintexts below
//! `2^table_bits * max_giant_steps`.

use std::collections::HashMap;

use ark_bls12_381::{Fr, G1Affine, G1Projective as G1};
use ark_ec::{CurveGroup, Group};
use ark_ff::{PrimeField, UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::ops::Mul;

use crate::{CryptoError, Result};

/// Size of a compressed G1 point in bytes.
pub const POINT_SIZE: usize = 48;

/// Size of a serialized [`Ciphertext`] (`c1 || c2`).
pub const CIPHERTEXT_SIZE: usize = 2 * POINT_SIZE;

/// Largest accepted baby-step table size, in bits.
pub const MAX_TABLE_BITS: u32 = 24;

/// ElGamal secret key.
pub struct SecretKey {
    pub(crate) scalar: Fr,
}

/// ElGamal public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) point: G1,
}

/// ElGamal keypair.
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

/// An ElGamal ciphertext `(c1, c2)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    c1: G1,
    c2: G1,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        let scalar = Fr::rand(&mut rng);
        Self::from_scalar(scalar)
    }

    /// Derive a keypair deterministically from 32 seed bytes (tests and fixtures).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_scalar(Fr::from_le_bytes_mod_order(seed))
    }

    fn from_scalar(scalar: Fr) -> Self {
        let public = PublicKey {
            point: G1::generator().mul(scalar),
        };
        Self {
            secret: SecretKey { scalar },
            public,
        }
    }
}

impl SecretKey {
    /// Recover `m * G` from a ciphertext.
    pub fn decrypt_point(&self, ciphertext: &Ciphertext) -> G1 {
        ciphertext.c2 - ciphertext.c1.mul(self.scalar)
    }

    /// Fully decrypt a ciphertext, solving the discrete log with `table`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::DiscreteLogOutOfRange`] if the plaintext exceeds the table's range
    pub fn decrypt(&self, ciphertext: &Ciphertext, table: &DiscreteLogTable) -> Result<u64> {
        table.solve(&self.decrypt_point(ciphertext))
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            point: G1::generator().mul(self.scalar),
        }
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.scalar = Fr::zero();
    }
}

impl PublicKey {
    /// Encrypt `value` with fresh randomness.
    pub fn encrypt(&self, value: u64) -> Ciphertext {
        let mut rng = rand::rngs::OsRng;
        self.encrypt_with_randomness(value, Fr::rand(&mut rng))
    }

    /// Encrypt `value` with caller-supplied randomness.
    pub fn encrypt_with_randomness(&self, value: u64, randomness: Fr) -> Ciphertext {
        let g = G1::generator();
        Ciphertext {
            c1: g.mul(randomness),
            c2: g.mul(Fr::from(value)) + self.point.mul(randomness),
        }
    }

    /// Compressed encoding (48 bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        compress(&self.point.into_affine())
    }

    /// Decode a compressed public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            point: decompress(bytes)?.into(),
        })
    }
}

impl Ciphertext {
    /// Homomorphic addition: the result decrypts to the sum of both plaintexts.
    pub fn add(&self, other: &Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: self.c1 + other.c1,
            c2: self.c2 + other.c2,
        }
    }

    /// Serialize as `compress(c1) || compress(c2)`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let affine = G1::normalize_batch(&[self.c1, self.c2]);
        let mut out = Vec::with_capacity(CIPHERTEXT_SIZE);
        for point in &affine {
            out.extend_from_slice(&compress(point)?);
        }
        Ok(out)
    }

    /// Deserialize from [`to_bytes`](Ciphertext::to_bytes) output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CIPHERTEXT_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: CIPHERTEXT_SIZE,
                actual: bytes.len(),
            });
        }
        let (c1, c2) = bytes.split_at(POINT_SIZE);
        Ok(Self {
            c1: decompress(c1)?.into(),
            c2: decompress(c2)?.into(),
        })
    }
}

/// Baby-step/giant-step lookup table for discrete logs base G.
pub struct DiscreteLogTable {
    baby_steps: HashMap<Vec<u8>, u64>,
    stride: u64,
    max_giant_steps: u64,
    giant_step: G1,
}

impl DiscreteLogTable {
    /// Build a table of `2^table_bits` baby steps.
    ///
    /// Decryption covers plaintexts in `[0, 2^table_bits * max_giant_steps)`.
    pub fn new(table_bits: u32, max_giant_steps: u64) -> Result<Self> {
        if table_bits == 0 || table_bits > MAX_TABLE_BITS {
            return Err(CryptoError::InvalidInput(format!(
                "table_bits must be in 1..={MAX_TABLE_BITS}, got {table_bits}"
            )));
        }
        if max_giant_steps == 0 {
            return Err(CryptoError::InvalidInput(
                "max_giant_steps must be non-zero".into(),
            ));
        }

        let stride = 1u64 << table_bits;
        let g = G1::generator();
        let mut points = Vec::with_capacity(stride as usize);
        let mut acc = G1::zero();
        for _ in 0..stride {
            points.push(acc);
            acc += g;
        }

        let mut baby_steps = HashMap::with_capacity(points.len());
        for (j, point) in G1::normalize_batch(&points).iter().enumerate() {
            baby_steps.insert(compress(point)?, j as u64);
        }

        Ok(Self {
            baby_steps,
            stride,
            max_giant_steps,
            giant_step: -g.mul(Fr::from(stride)),
        })
    }

    /// Exclusive upper bound of solvable plaintexts.
    pub fn bound(&self) -> u64 {
        self.stride.saturating_mul(self.max_giant_steps)
    }

    /// Find `m` such that `m * G == point`.
    pub fn solve(&self, point: &G1) -> Result<u64> {
        let mut current = *point;
        for i in 0..self.max_giant_steps {
            let key = compress(&current.into_affine())?;
            if let Some(j) = self.baby_steps.get(&key) {
                return Ok(i * self.stride + j);
            }
            current += self.giant_step;
        }
        Err(CryptoError::DiscreteLogOutOfRange {
            bound: self.bound(),
        })
    }
}

pub(crate) fn compress(point: &G1Affine) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(POINT_SIZE);
    point
        .serialize_compressed(&mut out)
        .map_err(|e| CryptoError::Serialization(e.to_string()))?;
    Ok(out)
}

pub(crate) fn decompress(bytes: &[u8]) -> Result<G1Affine> {
    G1Affine::deserialize_compressed(bytes).map_err(|e| CryptoError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> DiscreteLogTable {
        DiscreteLogTable::new(8, 64).expect("table")
    }

    #[test]
    fn test_encrypt_decrypt() {
        let kp = KeyPair::generate();
        let table = small_table();
        let ct = kp.public.encrypt(100);
        assert_eq!(kp.secret.decrypt(&ct, &table).expect("decrypt"), 100);
    }

    #[test]
    fn test_decrypt_zero() {
        let kp = KeyPair::generate();
        let table = small_table();
        let ct = kp.public.encrypt(0);
        assert_eq!(kp.secret.decrypt(&ct, &table).expect("decrypt"), 0);
    }

    #[test]
    fn test_homomorphic_addition() {
        let kp = KeyPair::generate();
        let table = small_table();
        let sum = kp.public.encrypt(300).add(&kp.public.encrypt(1_200));
        assert_eq!(kp.secret.decrypt(&sum, &table).expect("decrypt"), 1_500);
    }

    #[test]
    fn test_randomized_encryption() {
        let kp = KeyPair::generate();
        assert_ne!(kp.public.encrypt(42), kp.public.encrypt(42));
    }

    #[test]
    fn test_out_of_range() {
        let kp = KeyPair::generate();
        let table = DiscreteLogTable::new(4, 2).expect("table");
        assert_eq!(table.bound(), 32);
        let ct = kp.public.encrypt(32);
        assert!(matches!(
            kp.secret.decrypt(&ct, &table),
            Err(CryptoError::DiscreteLogOutOfRange { bound: 32 })
        ));
        let ct = kp.public.encrypt(31);
        assert_eq!(kp.secret.decrypt(&ct, &table).expect("decrypt"), 31);
    }

    #[test]
    fn test_wrong_key_does_not_decrypt() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let table = small_table();
        let ct = kp1.public.encrypt(7);
        assert!(kp2.secret.decrypt(&ct, &table).is_err());
    }

    #[test]
    fn test_ciphertext_serialization() {
        let kp = KeyPair::from_seed(&[9u8; 32]);
        let ct = kp.public.encrypt(55);
        let bytes = ct.to_bytes().expect("serialize");
        assert_eq!(bytes.len(), CIPHERTEXT_SIZE);
        let restored = Ciphertext::from_bytes(&bytes).expect("deserialize");
        assert_eq!(restored, ct);
        assert!(Ciphertext::from_bytes(&bytes[1..]).is_err());
    }

    #[test]
    fn test_public_key_serialization() {
        let kp = KeyPair::from_seed(&[3u8; 32]);
        let bytes = kp.public.to_bytes().expect("serialize");
        assert_eq!(bytes.len(), POINT_SIZE);
        assert_eq!(PublicKey::from_bytes(&bytes).expect("deserialize"), kp.public);
        assert_eq!(kp.secret.public_key(), kp.public);
    }

    #[test]
    fn test_invalid_table_parameters() {
        assert!(DiscreteLogTable::new(0, 1).is_err());
        assert!(DiscreteLogTable::new(MAX_TABLE_BITS + 1, 1).is_err());
        assert!(DiscreteLogTable::new(4, 0).is_err());
    }
}
