//! In-process decryption oracle.
//!
//! `LocalOracle` owns the ElGamal secret key and the signer keys. Requests
//! are queued with a snapshot of their ciphertexts taken at request time and
//! fulfilled later, in any order, by whoever drives the oracle (the daemon's
//! relay task, or a test). A request whose decryption fails is dropped and
//! its error returned; it is never retried.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use tessera_crypto::ecies;
use tessera_crypto::ed25519::SigningKey;
use tessera_crypto::elgamal::{DiscreteLogTable, KeyPair};
use tessera_types::{
    CallbackSelector, CiphertextHandle, DecryptionProof, DecryptionResponse, RequestId, FIRST_ID,
};

use crate::coprocessor::{InMemoryCoprocessor, StoredCiphertext};
use crate::gateway::DecryptionOracle;
use crate::payload::{self, Cleartext};
use crate::proof::{self, SignerSet};
use crate::{OracleError, Result};

/// Default baby-step table size: 2^16 entries.
pub const DEFAULT_DLOG_TABLE_BITS: u32 = 16;

/// Default giant-step bound; with the default table this covers `[0, 2^32)`.
pub const DEFAULT_MAX_GIANT_STEPS: u64 = 1 << 16;

/// Oracle tuning knobs.
///
/// # Decryption bound
///
/// Numeric values are recovered by baby-step giant-step search, which only
/// solves plaintexts below `2^dlog_table_bits * max_giant_steps` (see
/// [`OracleConfig::decryption_bound`]). The defaults give `2^32`: any single
/// `u32` amount decrypts, but a content total can pass the bound after a few
/// large sales. A request holding a value at or above the bound fails at
/// fulfilment with [`tessera_crypto::CryptoError::DiscreteLogOutOfRange`]
/// and is dropped, so its callback never arrives and the ledger keeps the
/// request outstanding.
///
/// Raising `max_giant_steps` extends the bound linearly at a linear cost in
/// worst-case decryption time; each extra table bit doubles the bound and
/// the table's memory.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    pub dlog_table_bits: u32,
    pub max_giant_steps: u64,
    pub signer_count: usize,
    pub signer_threshold: usize,
}

impl OracleConfig {
    /// Exclusive upper bound of decryptable numeric plaintexts.
    pub fn decryption_bound(&self) -> u64 {
        1u64.checked_shl(self.dlog_table_bits)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.max_giant_steps)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            dlog_table_bits: DEFAULT_DLOG_TABLE_BITS,
            max_giant_steps: DEFAULT_MAX_GIANT_STEPS,
            signer_count: 1,
            signer_threshold: 1,
        }
    }
}

/// A queued request.
struct QueuedRequest {
    request_id: RequestId,
    selector: CallbackSelector,
    ciphertexts: Vec<StoredCiphertext>,
}

struct QueueState {
    next_request_id: RequestId,
    queue: VecDeque<QueuedRequest>,
}

/// Summary of a queued request, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub request_id: RequestId,
    pub selector: CallbackSelector,
    pub ciphertext_count: usize,
}

/// An oracle that decrypts in-process and signs with local keys.
pub struct LocalOracle {
    keys: KeyPair,
    coprocessor: Arc<InMemoryCoprocessor>,
    signing_keys: Vec<SigningKey>,
    signer_set: SignerSet,
    table: DiscreteLogTable,
    state: Mutex<QueueState>,
}

impl LocalOracle {
    /// Generate fresh keys and an empty coprocessor.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let signing_keys = (0..config.signer_count)
            .map(|_| SigningKey::generate())
            .collect();
        Self::with_keys(KeyPair::generate(), signing_keys, config)
    }

    /// Build an oracle from existing key material.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidConfig`] if the threshold is unreachable
    /// - [`OracleError::Crypto`] if the discrete-log table parameters are invalid
    pub fn with_keys(
        keys: KeyPair,
        signing_keys: Vec<SigningKey>,
        config: &OracleConfig,
    ) -> Result<Self> {
        let signer_set = SignerSet::new(
            signing_keys.iter().map(SigningKey::verifying_key).collect(),
            config.signer_threshold,
        )?;
        let table = DiscreteLogTable::new(config.dlog_table_bits, config.max_giant_steps)?;
        let coprocessor = Arc::new(InMemoryCoprocessor::new(keys.public.clone()));

        tracing::info!(
            signers = signing_keys.len(),
            threshold = config.signer_threshold,
            dlog_bound = table.bound(),
            "decryption oracle ready"
        );

        Ok(Self {
            keys,
            coprocessor,
            signing_keys,
            signer_set,
            table,
            state: Mutex::new(QueueState {
                next_request_id: FIRST_ID,
                queue: VecDeque::new(),
            }),
        })
    }

    /// The coprocessor holding ciphertexts encrypted to this oracle's key.
    pub fn coprocessor(&self) -> Arc<InMemoryCoprocessor> {
        Arc::clone(&self.coprocessor)
    }

    pub fn signer_set(&self) -> &SignerSet {
        &self.signer_set
    }

    /// Exclusive upper bound of numeric plaintexts this oracle can decrypt.
    pub fn decryption_bound(&self) -> u64 {
        self.table.bound()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>> {
        self.state.lock().map_err(|_| OracleError::StatePoisoned)
    }

    /// Number of requests awaiting fulfilment.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.lock()?.queue.len())
    }

    /// Queued requests, oldest first.
    pub fn pending(&self) -> Result<Vec<PendingSummary>> {
        Ok(self
            .lock()?
            .queue
            .iter()
            .map(|r| PendingSummary {
                request_id: r.request_id,
                selector: r.selector,
                ciphertext_count: r.ciphertexts.len(),
            })
            .collect())
    }

    /// Fulfil the oldest queued request, if any.
    pub fn fulfil_next(&self) -> Result<Option<DecryptionResponse>> {
        let next = self.lock()?.queue.pop_front();
        next.map(|request| self.answer(request)).transpose()
    }

    /// Fulfil a specific queued request, regardless of queue position.
    ///
    /// # Errors
    ///
    /// - [`OracleError::NoSuchRequest`] if the request is not queued
    pub fn fulfil(&self, request_id: RequestId) -> Result<DecryptionResponse> {
        let request = {
            let mut state = self.lock()?;
            let position = state
                .queue
                .iter()
                .position(|r| r.request_id == request_id)
                .ok_or(OracleError::NoSuchRequest(request_id))?;
            state
                .queue
                .remove(position)
                .ok_or(OracleError::NoSuchRequest(request_id))?
        };
        self.answer(request)
    }

    /// Drain the queue. Each entry is the outcome for one request.
    pub fn fulfil_all(&self) -> Vec<Result<DecryptionResponse>> {
        let drained: Vec<QueuedRequest> = match self.lock() {
            Ok(mut state) => state.queue.drain(..).collect(),
            Err(e) => return vec![Err(e)],
        };
        drained
            .into_iter()
            .map(|request| self.answer(request))
            .collect()
    }

    fn decrypt(&self, stored: &StoredCiphertext) -> Result<Cleartext> {
        Ok(match stored {
            StoredCiphertext::U64(ct) => Cleartext::U64(self.keys.secret.decrypt(ct, &self.table)?),
            StoredCiphertext::Bytes(sealed) => {
                Cleartext::Bytes(ecies::open(&self.keys.secret, sealed)?)
            }
        })
    }

    fn answer(&self, request: QueuedRequest) -> Result<DecryptionResponse> {
        let cleartexts = request
            .ciphertexts
            .iter()
            .map(|stored| self.decrypt(stored))
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| {
                tracing::warn!(request_id = request.request_id, error = %e, "decryption failed, request dropped");
            })?;

        let payload = payload::encode(&cleartexts);
        let proof = proof::sign(&self.signing_keys, request.request_id, &payload);

        tracing::debug!(
            request_id = request.request_id,
            selector = ?request.selector,
            fields = cleartexts.len(),
            "decryption request fulfilled"
        );

        Ok(DecryptionResponse {
            request_id: request.request_id,
            selector: request.selector,
            cleartexts: payload,
            proof,
        })
    }
}

impl DecryptionOracle for LocalOracle {
    fn request_decryption(
        &self,
        handles: &[CiphertextHandle],
        selector: CallbackSelector,
    ) -> Result<RequestId> {
        if handles.is_empty() {
            return Err(OracleError::EmptyRequest);
        }
        let ciphertexts = handles
            .iter()
            .map(|h| self.coprocessor.fetch(h))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.lock()?;
        let request_id = state.next_request_id;
        state.next_request_id += 1;
        state.queue.push_back(QueuedRequest {
            request_id,
            selector,
            ciphertexts,
        });

        tracing::debug!(request_id, ?selector, handles = handles.len(), "decryption requested");
        Ok(request_id)
    }

    fn check_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<()> {
        self.signer_set.verify(request_id, cleartexts, proof)
    }
}
