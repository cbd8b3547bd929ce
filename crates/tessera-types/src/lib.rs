//! # tessera-types
//!
//! Shared domain types used across the Tessera workspace: ciphertext handles,
//! sale and royalty records, decryption request bookkeeping, and the
//! notifications the ledger emits.

pub mod events;
pub mod handle;
pub mod ledger;
pub mod request;

pub use events::{Event, EventType, LedgerEvent};
pub use handle::{CiphertextHandle, ValueKind};
pub use ledger::{ContentTotalReport, DecryptedRoyalty, EncryptedSale};
pub use request::{
    CallbackSelector, DecryptionProof, DecryptionResponse, PendingRequest, SignerSignature,
};

/// Sequential sale identifier. The first sale is 1; 0 is never assigned.
pub type SaleId = u64;

/// Oracle-assigned decryption request identifier.
pub type RequestId = u64;

/// Account identifier used by the access policy.
pub type AccountId = [u8; 32];

/// First identifier handed out by the ledger and the oracle.
pub const FIRST_ID: u64 = 1;

/// Error returned when parsing textual forms of shared types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The decoded value has the wrong length.
    #[error("invalid length: expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    /// Unknown value kind tag.
    #[error("unknown value kind: {0}")]
    Kind(String),

    /// The textual form is missing its `kind:` prefix.
    #[error("malformed handle: {0}")]
    Malformed(String),
}

/// Parse a hex-encoded 32-byte account identifier.
pub fn parse_account_id(s: &str) -> Result<AccountId, ParseError> {
    let bytes = hex::decode(s)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ParseError::Length {
        expected: 32,
        actual: len,
    })
}
