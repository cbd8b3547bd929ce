//! The interface the ledger consumes from the decryption oracle.

use tessera_types::{CallbackSelector, CiphertextHandle, DecryptionProof, RequestId};

use crate::Result;

/// A trusted, asynchronous decryption service.
///
/// `request_decryption` returns immediately with an identifier; the
/// cleartexts arrive later through the ledger callback named by the
/// selector. There is no cancellation.
pub trait DecryptionOracle: Send + Sync {
    /// Queue decryption of `handles`, in order.
    fn request_decryption(
        &self,
        handles: &[CiphertextHandle],
        selector: CallbackSelector,
    ) -> Result<RequestId>;

    /// Verify that `proof` attests `cleartexts` as the answer to `request_id`.
    ///
    /// # Errors
    ///
    /// - [`crate::OracleError::InvalidProof`] if verification fails
    fn check_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()>;
}
