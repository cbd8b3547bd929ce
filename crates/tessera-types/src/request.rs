//! Decryption request bookkeeping shared by the ledger and the oracle.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{RequestId, SaleId};

/// Which ledger entry point a decryption response must be delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackSelector {
    /// `on_decryption_callback`: cleartexts are `(content_id, amount)`.
    SaleRoyalty,
    /// `on_content_total_callback`: cleartexts are `(total)`.
    ContentTotal,
}

/// What an outstanding request was issued for.
///
/// Sale-level and content-level requests share one map keyed by the
/// oracle-issued [`RequestId`]; the variant tells them apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum PendingRequest {
    Sale(SaleId),
    ContentTotal(String),
}

impl PendingRequest {
    /// The callback this request expects.
    pub fn selector(&self) -> CallbackSelector {
        match self {
            PendingRequest::Sale(_) => CallbackSelector::SaleRoyalty,
            PendingRequest::ContentTotal(_) => CallbackSelector::ContentTotal,
        }
    }
}

/// One oracle signer's signature over a released payload.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSignature {
    /// Ed25519 public key of the signer.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signer: [u8; 32],
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: [u8; 64],
}

/// Proof that the cleartexts were released by the oracle for a given request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signatures: Vec<SignerSignature>,
}

/// A fulfilled decryption request, ready to be delivered to the ledger.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub request_id: RequestId,
    pub selector: CallbackSelector,
    /// Length-prefixed cleartext fields.
    #[serde_as(as = "serde_with::hex::Hex")]
    pub cleartexts: Vec<u8>,
    pub proof: DecryptionProof,
}
