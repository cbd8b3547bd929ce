//! # tessera-oracle
//!
//! The decryption side of the royalty ledger.
//!
//! The ledger never holds key material. It hands plaintexts across a trusted
//! boundary to a [`Coprocessor`], which returns opaque handles and performs
//! homomorphic additions on them. When a cleartext is needed, the ledger asks
//! a [`DecryptionOracle`] for it; the oracle answers later, off the critical
//! path, with the cleartexts and a signature proof.
//!
//! ## Modules
//!
//! - [`coprocessor`]: Ciphertext store, handle minting, homomorphic addition
//! - [`gateway`]: The request/verify interface the ledger consumes
//! - [`payload`]: Cleartext payload encoding
//! - [`proof`]: Threshold Ed25519 decryption proofs
//! - [`local`]: In-process oracle that queues and fulfils requests

pub mod coprocessor;
pub mod gateway;
pub mod local;
pub mod payload;
pub mod proof;

pub use coprocessor::{Coprocessor, InMemoryCoprocessor};
pub use gateway::DecryptionOracle;
pub use local::{LocalOracle, OracleConfig};

use tessera_types::{RequestId, ValueKind};

/// Error types for coprocessor and oracle operations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The handle does not name a ciphertext known to the coprocessor.
    #[error("unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    /// An operation was applied to a handle of the wrong kind.
    #[error("value kind mismatch: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        /// Kind the operation requires.
        expected: ValueKind,
        /// Kind of the handle supplied.
        actual: ValueKind,
    },

    /// A decryption request named no handles.
    #[error("decryption request names no ciphertexts")]
    EmptyRequest,

    /// No queued request has this identifier.
    #[error("no pending request {0}")]
    NoSuchRequest(RequestId),

    /// The proof does not carry enough valid signer signatures.
    #[error("invalid decryption proof: {0}")]
    InvalidProof(String),

    /// A cleartext payload is not a well-formed field list.
    #[error("malformed cleartext payload: {0}")]
    MalformedPayload(String),

    /// Invalid oracle configuration.
    #[error("invalid oracle configuration: {0}")]
    InvalidConfig(String),

    /// Internal lock was poisoned by a panicking thread.
    #[error("oracle state lock poisoned")]
    StatePoisoned,

    /// Underlying cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] tessera_crypto::CryptoError),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
