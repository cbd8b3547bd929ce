//! # tessera-ledger
//!
//! The royalty ledger: encrypted sales, their one-time decryption into
//! royalty records, and per-content running totals kept under homomorphic
//! encryption.
//!
//! Every public operation runs to completion against `&mut self`; callers
//! that share a ledger serialize access (the daemon holds it behind a mutex).
//! A failed operation leaves all state exactly as it was.
//!
//! ## Modules
//!
//! - [`ledger`]: `RoyaltyLedger` and its request/callback lifecycle
//! - [`amount`]: Decimal ASCII decoding of released amounts
//! - [`auth`]: Recorder allow-list
//! - [`clock`]: Timestamp source
//! - [`sink`]: Notification sink

pub mod amount;
pub mod auth;
pub mod clock;
pub mod ledger;
pub mod sink;

pub use auth::AccessPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{CallbackOutcome, RoyaltyLedger};
pub use sink::{EventLog, EventSink};

use tessera_oracle::OracleError;
use tessera_types::{CallbackSelector, RequestId, SaleId, ValueKind};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Decryption was requested for a sale whose royalty is already released.
    #[error("sale {0} is already decrypted")]
    AlreadyDecrypted(SaleId),

    /// A callback named a request the ledger never issued.
    #[error("unknown decryption request {0}")]
    UnknownRequest(RequestId),

    /// A callback arrived for a sale that another callback already released.
    #[error("royalty for sale {0} already released")]
    AlreadyReleased(SaleId),

    /// The oracle's proof did not verify.
    #[error("invalid decryption proof: {0}")]
    InvalidProof(String),

    /// A released amount is not a decimal number in range.
    #[error("malformed amount: {0}")]
    MalformedAmount(String),

    /// No running total exists for this content identifier.
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// No sale was recorded under this identifier.
    #[error("sale {0} not found")]
    SaleNotFound(SaleId),

    /// A callback was delivered to the entry point for the other request kind.
    #[error("request {request_id} expects a {expected:?} callback, got {actual:?}")]
    CallbackMismatch {
        request_id: RequestId,
        expected: CallbackSelector,
        actual: CallbackSelector,
    },

    /// The cleartext payload does not decode into the expected fields.
    #[error("malformed cleartext payload: {0}")]
    MalformedPayload(String),

    /// A sale handle names the wrong kind of ciphertext.
    #[error("{field} handle must be {expected:?}, got {actual:?}")]
    HandleKind {
        field: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The access policy rejected the caller.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The coprocessor or oracle refused an operation.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
