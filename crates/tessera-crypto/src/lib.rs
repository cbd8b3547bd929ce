//! # tessera-crypto
//!
//! Cryptographic primitives for the Tessera royalty ledger.
//!
//! The suite is fixed: there is no algorithm negotiation between the ledger,
//! the coprocessor and the decryption oracle.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing and registered context strings
//! - [`chacha20`]: ChaCha20-Poly1305 AEAD encryption (RFC 8439)
//! - [`ed25519`]: Ed25519 signing and verification (RFC 8032)
//! - [`elgamal`]: Additively homomorphic exponential ElGamal on BLS12-381 G1
//! - [`ecies`]: ECIES over BLS12-381 G1 for byte-string plaintexts

pub mod blake3;
pub mod chacha20;
pub mod ecies;
pub mod ed25519;
pub mod elgamal;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The plaintext behind an ElGamal ciphertext lies outside the
    /// discrete-log search range.
    #[error("plaintext out of discrete-log range (searched up to {bound})")]
    DiscreteLogOutOfRange {
        /// Exclusive upper bound of the search.
        bound: u64,
    },

    /// ECIES encryption/decryption failed.
    #[error("ECIES error: {0}")]
    Ecies(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
