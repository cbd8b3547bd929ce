//! Sale and royalty records.

use serde::{Deserialize, Serialize};

use crate::{CiphertextHandle, RequestId, SaleId};

/// An encrypted sale as recorded by the ledger. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSale {
    pub sale_id: SaleId,
    pub encrypted_amount: CiphertextHandle,
    pub encrypted_content_id: CiphertextHandle,
    /// Unix seconds.
    pub created_at: u64,
}

/// The decrypted counterpart of a sale.
///
/// Starts as the zero placeholder `("", 0, false)` and moves to
/// `(content_id, amount, true)` exactly once. A placeholder means "not yet
/// available", never a genuine zero royalty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedRoyalty {
    pub content_id: String,
    pub amount: u32,
    pub released: bool,
}

impl DecryptedRoyalty {
    /// The pending placeholder stored alongside every new sale.
    pub fn pending() -> Self {
        Self::default()
    }

    /// A resolved royalty.
    pub fn released(content_id: String, amount: u32) -> Self {
        Self {
            content_id,
            amount,
            released: true,
        }
    }
}

/// Plaintext running total surfaced by a content-total callback.
///
/// Read-only telemetry: producing one never mutates ledger state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTotalReport {
    pub request_id: RequestId,
    pub content_id: String,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_placeholder() {
        let pending = DecryptedRoyalty::pending();
        assert_eq!(pending.content_id, "");
        assert_eq!(pending.amount, 0);
        assert!(!pending.released);
    }

    #[test]
    fn test_released() {
        let royalty = DecryptedRoyalty::released("movie-1".to_string(), 100);
        assert!(royalty.released);
        assert_ne!(royalty, DecryptedRoyalty::pending());
    }
}
