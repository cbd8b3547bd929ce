//! Ciphertext store and homomorphic operations.
//!
//! Handles are `BLAKE3::derive_key("Tessera v1 ciphertext-handle",
//! kind || ciphertext)`. Encryption is randomized, so two encryptions of the
//! same plaintext never share a handle.

use std::collections::HashMap;
use std::sync::RwLock;

use tessera_crypto::blake3::{self, contexts};
use tessera_crypto::ecies::{self, SealedBytes};
use tessera_crypto::elgamal::{Ciphertext, PublicKey};
use tessera_types::{CiphertextHandle, ValueKind};

use crate::{OracleError, Result};

/// Operations the ledger may perform on encrypted values.
///
/// `encrypt_*` is the trusted construction-from-plaintext boundary; `add` is
/// the only arithmetic. No method reveals a plaintext. Decryption requests
/// copy the ciphertexts they name, so discarding a handle never affects a
/// request already queued.
pub trait Coprocessor: Send + Sync {
    /// Encrypt an integer and return its handle.
    fn encrypt_u64(&self, value: u64) -> Result<CiphertextHandle>;

    /// Encrypt a byte string and return its handle.
    fn encrypt_bytes(&self, value: &[u8]) -> Result<CiphertextHandle>;

    /// Homomorphically add two `U64` ciphertexts.
    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle>;

    /// Whether the handle names a stored ciphertext.
    fn contains(&self, handle: &CiphertextHandle) -> bool;

    /// Drop a stored ciphertext. Returns whether it was present.
    fn discard(&self, handle: &CiphertextHandle) -> bool;
}

/// A ciphertext as held by the coprocessor.
#[derive(Clone, Debug)]
pub enum StoredCiphertext {
    U64(Ciphertext),
    Bytes(SealedBytes),
}

impl StoredCiphertext {
    pub fn kind(&self) -> ValueKind {
        match self {
            StoredCiphertext::U64(_) => ValueKind::U64,
            StoredCiphertext::Bytes(_) => ValueKind::Bytes,
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(match self {
            StoredCiphertext::U64(ct) => ct.to_bytes()?,
            StoredCiphertext::Bytes(sealed) => sealed.to_bytes(),
        })
    }
}

/// Coprocessor keeping ciphertexts in memory, encrypting to one public key.
pub struct InMemoryCoprocessor {
    public_key: PublicKey,
    ciphertexts: RwLock<HashMap<[u8; 32], StoredCiphertext>>,
}

impl InMemoryCoprocessor {
    /// Create an empty store that encrypts to `public_key`.
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            ciphertexts: RwLock::new(HashMap::new()),
        }
    }

    /// The key all ciphertexts are encrypted to.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Number of stored ciphertexts.
    pub fn len(&self) -> usize {
        self.ciphertexts.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the ciphertext behind a handle.
    ///
    /// # Errors
    ///
    /// - [`OracleError::UnknownHandle`] if the id is not stored or its kind differs
    pub fn fetch(&self, handle: &CiphertextHandle) -> Result<StoredCiphertext> {
        let map = self
            .ciphertexts
            .read()
            .map_err(|_| OracleError::StatePoisoned)?;
        match map.get(handle.id()) {
            Some(stored) if stored.kind() == handle.kind() => Ok(stored.clone()),
            _ => Err(OracleError::UnknownHandle(handle.to_string())),
        }
    }

    fn insert(&self, stored: StoredCiphertext) -> Result<CiphertextHandle> {
        let kind = stored.kind();
        let mut material = vec![kind_tag(kind)];
        material.extend_from_slice(&stored.to_bytes()?);
        let id = blake3::derive_key(contexts::CIPHERTEXT_HANDLE, &material);

        self.ciphertexts
            .write()
            .map_err(|_| OracleError::StatePoisoned)?
            .insert(id, stored);
        Ok(CiphertextHandle::new(id, kind))
    }

    fn fetch_u64(&self, handle: &CiphertextHandle) -> Result<Ciphertext> {
        if handle.kind() != ValueKind::U64 {
            return Err(OracleError::KindMismatch {
                expected: ValueKind::U64,
                actual: handle.kind(),
            });
        }
        match self.fetch(handle)? {
            StoredCiphertext::U64(ct) => Ok(ct),
            StoredCiphertext::Bytes(_) => Err(OracleError::KindMismatch {
                expected: ValueKind::U64,
                actual: ValueKind::Bytes,
            }),
        }
    }
}

fn kind_tag(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::U64 => 0x01,
        ValueKind::Bytes => 0x02,
    }
}

impl Coprocessor for InMemoryCoprocessor {
    fn encrypt_u64(&self, value: u64) -> Result<CiphertextHandle> {
        self.insert(StoredCiphertext::U64(self.public_key.encrypt(value)))
    }

    fn encrypt_bytes(&self, value: &[u8]) -> Result<CiphertextHandle> {
        let sealed = ecies::seal(&self.public_key, value)?;
        self.insert(StoredCiphertext::Bytes(sealed))
    }

    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle> {
        let sum = self.fetch_u64(lhs)?.add(&self.fetch_u64(rhs)?);
        let handle = self.insert(StoredCiphertext::U64(sum))?;
        tracing::debug!(%lhs, %rhs, result = %handle, "homomorphic add");
        Ok(handle)
    }

    fn contains(&self, handle: &CiphertextHandle) -> bool {
        self.fetch(handle).is_ok()
    }

    fn discard(&self, handle: &CiphertextHandle) -> bool {
        let Ok(mut map) = self.ciphertexts.write() else {
            return false;
        };
        if !map.get(handle.id()).is_some_and(|s| s.kind() == handle.kind()) {
            return false;
        }
        map.remove(handle.id());
        tracing::debug!(%handle, "ciphertext discarded");
        true
    }
}
