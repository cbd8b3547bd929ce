//! Threshold Ed25519 decryption proofs.
//!
//! Every oracle signer signs
//! `BLAKE3::derive_key("Tessera v1 decryption-proof", LE32-fields(LE64(request_id), cleartexts))`.
//! A proof is accepted when at least `threshold` distinct signers from the
//! configured set signed that message.

use std::collections::HashSet;

use tessera_crypto::blake3::{self, contexts};
use tessera_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use tessera_types::{DecryptionProof, RequestId, SignerSignature};

use crate::{OracleError, Result};

/// The message signers sign for a released payload.
pub fn proof_message(request_id: RequestId, cleartexts: &[u8]) -> [u8; 32] {
    let encoded = blake3::encode_multi_field(&[&request_id.to_le_bytes(), cleartexts]);
    blake3::derive_key(contexts::DECRYPTION_PROOF, &encoded)
}

/// Sign a payload with each of `signers`.
pub fn sign(signers: &[SigningKey], request_id: RequestId, cleartexts: &[u8]) -> DecryptionProof {
    let message = proof_message(request_id, cleartexts);
    DecryptionProof {
        signatures: signers
            .iter()
            .map(|key| SignerSignature {
                signer: key.verifying_key().to_bytes(),
                signature: key.sign(&message).to_bytes(),
            })
            .collect(),
    }
}

/// The allow-listed oracle signers and the quorum they must reach.
#[derive(Clone, Debug)]
pub struct SignerSet {
    signers: Vec<VerifyingKey>,
    threshold: usize,
}

impl SignerSet {
    /// # Errors
    ///
    /// - [`OracleError::InvalidConfig`] unless `1 <= threshold <= signers.len()`
    pub fn new(signers: Vec<VerifyingKey>, threshold: usize) -> Result<Self> {
        if threshold == 0 || threshold > signers.len() {
            return Err(OracleError::InvalidConfig(format!(
                "threshold {threshold} out of range for {} signers",
                signers.len()
            )));
        }
        Ok(Self { signers, threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn signers(&self) -> &[VerifyingKey] {
        &self.signers
    }

    fn is_member(&self, key: &[u8; 32]) -> bool {
        self.signers.iter().any(|s| s.as_bytes() == key)
    }

    /// Check a proof against `request_id` and `cleartexts`.
    ///
    /// Signatures from unknown signers, duplicates and invalid signatures
    /// are ignored; only the count of distinct valid members matters.
    pub fn verify(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()> {
        let message = proof_message(request_id, cleartexts);
        let mut counted: HashSet<[u8; 32]> = HashSet::new();

        for entry in &proof.signatures {
            if counted.contains(&entry.signer) || !self.is_member(&entry.signer) {
                continue;
            }
            let Ok(key) = VerifyingKey::from_bytes(&entry.signer) else {
                continue;
            };
            if key
                .verify(&message, &Signature::from_bytes(&entry.signature))
                .is_ok()
            {
                counted.insert(entry.signer);
            }
        }

        if counted.len() < self.threshold {
            return Err(OracleError::InvalidProof(format!(
                "{} of {} required signatures valid",
                counted.len(),
                self.threshold
            )));
        }
        Ok(())
    }
}
