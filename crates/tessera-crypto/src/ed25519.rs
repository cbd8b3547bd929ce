//! Ed25519 keys for oracle signers and ledger accounts.
//!
//! Oracle signers sign each released cleartext payload and the ledger checks
//! those signatures before accepting a callback. Ledger accounts (owner,
//! recorders, the daemon operator) are identified by a BLAKE3 digest of an
//! Ed25519 public key.

use ed25519_dalek::{Signer, Verifier};
use zeroize::Zeroize;

use crate::blake3::{self, contexts};
use crate::{CryptoError, Result};

/// Secret half of a signer or operator key.
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Public half; members of an oracle signer set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Rebuild a key from its 32-byte seed, e.g. the daemon's `operator.key`.
    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// The 32-byte seed. Callers persisting it own its secrecy.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message))
    }
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        let mut seed = self.0.to_bytes();
        let key = Self::from_bytes(&seed);
        seed.zeroize();
        key
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        let mut seed = self.0.to_bytes();
        seed.zeroize();
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SigningKey")
            .field(&hex_prefix(self.verifying_key().as_bytes()))
            .finish()
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    bytes[..4].iter().map(|b| format!("{b:02x}")).collect()
}

impl VerifyingKey {
    /// # Errors
    ///
    /// - [`CryptoError::InvalidInput`] if the bytes are not a curve point
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// # Errors
    ///
    /// - [`CryptoError::SignatureVerification`] if `signature` does not cover `message`
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.0
            .verify(message, &signature.0)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self(ed25519_dalek::Signature::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

/// Ledger account identifier of a public key.
///
/// `account_id = BLAKE3::derive_key("Tessera v1 account-id", public_key)`
pub fn derive_account_id(public_key: &VerifyingKey) -> [u8; 32] {
    blake3::derive_key(contexts::ACCOUNT_ID, public_key.as_bytes())
}
