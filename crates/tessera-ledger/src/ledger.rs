//! The royalty ledger.
//!
//! ## Lifecycle
//!
//! 1. [`RoyaltyLedger::record_sale`] stores an encrypted sale and a pending
//!    royalty placeholder.
//! 2. [`RoyaltyLedger::request_sale_decryption`] asks the oracle for
//!    `(content_id, amount)` and remembers the request.
//! 3. The oracle later delivers the cleartexts to
//!    [`RoyaltyLedger::on_decryption_callback`], which releases the royalty
//!    exactly once and folds the encrypted amount into the content's running
//!    total.
//! 4. Running totals can be decrypted on demand; that callback only reports
//!    the value and never changes ledger state.
//!
//! Outstanding requests of both kinds share one map keyed by the oracle's
//! request identifier, tagged with what they were issued for.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tessera_oracle::payload;
use tessera_oracle::{Coprocessor, DecryptionOracle, OracleError};
use tessera_types::{
    AccountId, CallbackSelector, CiphertextHandle, ContentTotalReport, DecryptedRoyalty,
    DecryptionProof, DecryptionResponse, EncryptedSale, LedgerEvent, PendingRequest, RequestId,
    SaleId, ValueKind, FIRST_ID,
};

use crate::amount::{parse_decimal_amount, parse_decimal_total};
use crate::auth::AccessPolicy;
use crate::clock::{Clock, SystemClock};
use crate::sink::EventSink;
use crate::{LedgerError, Result};

/// Result of routing a [`DecryptionResponse`] through
/// [`RoyaltyLedger::dispatch_callback`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    Royalty {
        sale_id: SaleId,
        royalty: DecryptedRoyalty,
    },
    ContentTotal(ContentTotalReport),
}

/// A content's running total.
#[derive(Clone, Copy, Debug)]
struct RunningTotal {
    handle: CiphertextHandle,
    /// Produced by the ledger's own `add`. A total that is still the first
    /// sale's amount handle is not minted and must outlive the total.
    minted: bool,
}

pub struct RoyaltyLedger {
    coprocessor: Arc<dyn Coprocessor>,
    oracle: Arc<dyn DecryptionOracle>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
    next_sale_id: SaleId,
    sales: BTreeMap<SaleId, EncryptedSale>,
    royalties: BTreeMap<SaleId, DecryptedRoyalty>,
    totals: HashMap<String, RunningTotal>,
    /// Content identifiers in first-release order.
    content_index: Vec<String>,
    requests: HashMap<RequestId, PendingRequest>,
}

impl RoyaltyLedger {
    pub fn new(
        coprocessor: Arc<dyn Coprocessor>,
        oracle: Arc<dyn DecryptionOracle>,
        sink: Arc<dyn EventSink>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            coprocessor,
            oracle,
            sink,
            clock: Arc::new(SystemClock),
            policy,
            next_sale_id: FIRST_ID,
            sales: BTreeMap::new(),
            royalties: BTreeMap::new(),
            totals: HashMap::new(),
            content_index: Vec::new(),
            requests: HashMap::new(),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ------------------------------------------------------------------
    // Sales
    // ------------------------------------------------------------------

    /// Record an encrypted sale and return its identifier.
    ///
    /// Only the handle kinds are checked here. Whether a handle names a
    /// stored ciphertext is found out when its decryption is requested.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if the policy rejects `caller`
    /// - [`LedgerError::HandleKind`] if the amount is not `U64` or the content
    ///   identifier is not `Bytes`
    pub fn record_sale(
        &mut self,
        caller: &AccountId,
        encrypted_amount: CiphertextHandle,
        encrypted_content_id: CiphertextHandle,
    ) -> Result<SaleId> {
        self.policy.check_record(caller)?;
        expect_kind("amount", &encrypted_amount, ValueKind::U64)?;
        expect_kind("content_id", &encrypted_content_id, ValueKind::Bytes)?;

        let sale_id = self.next_sale_id;
        let created_at = self.clock.now();
        self.next_sale_id += 1;
        self.sales.insert(
            sale_id,
            EncryptedSale {
                sale_id,
                encrypted_amount,
                encrypted_content_id,
                created_at,
            },
        );
        self.royalties.insert(sale_id, DecryptedRoyalty::pending());

        tracing::info!(sale_id, created_at, "sale recorded");
        self.sink.emit(LedgerEvent::SaleRecorded {
            sale_id,
            timestamp: created_at,
        });
        Ok(sale_id)
    }

    /// Ask the oracle to decrypt a sale's `(content_id, amount)`.
    ///
    /// A second request before the first resolves is accepted; whichever
    /// callback lands first releases the royalty and the other is rejected.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SaleNotFound`] if no such sale was recorded
    /// - [`LedgerError::AlreadyDecrypted`] if the royalty is already released
    /// - [`LedgerError::Oracle`] if the oracle refuses the request
    pub fn request_sale_decryption(&mut self, sale_id: SaleId) -> Result<RequestId> {
        let sale = self
            .sales
            .get(&sale_id)
            .ok_or(LedgerError::SaleNotFound(sale_id))?;
        if self.is_released(sale_id) {
            return Err(LedgerError::AlreadyDecrypted(sale_id));
        }

        let handles = [sale.encrypted_content_id, sale.encrypted_amount];
        let request_id = self
            .oracle
            .request_decryption(&handles, CallbackSelector::SaleRoyalty)?;
        self.requests
            .insert(request_id, PendingRequest::Sale(sale_id));

        tracing::debug!(sale_id, request_id, "sale decryption requested");
        self.sink.emit(LedgerEvent::DecryptionRequested {
            sale_id,
            request_id,
        });
        Ok(request_id)
    }

    /// Deliver the cleartexts for a sale decryption request.
    ///
    /// Checks run in order: known request, right request kind, not yet
    /// released, valid proof, well-formed payload. Nothing is written unless
    /// all of them pass.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRequest`] if the request was never issued here
    /// - [`LedgerError::CallbackMismatch`] if it was a content-total request
    /// - [`LedgerError::AlreadyReleased`] if another callback released the sale
    /// - [`LedgerError::InvalidProof`] if the proof does not verify
    /// - [`LedgerError::MalformedPayload`] if the payload is not two fields
    ///   or the content identifier is not UTF-8
    /// - [`LedgerError::MalformedAmount`] if the amount is not decimal ASCII
    pub fn on_decryption_callback(
        &mut self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<SaleId> {
        let sale_id = match self.pending_request(request_id)? {
            PendingRequest::Sale(sale_id) => *sale_id,
            other => {
                return Err(mismatch(
                    request_id,
                    other.selector(),
                    CallbackSelector::SaleRoyalty,
                ))
            }
        };
        let sale = self
            .sales
            .get(&sale_id)
            .ok_or(LedgerError::SaleNotFound(sale_id))?;
        if self.is_released(sale_id) {
            tracing::warn!(sale_id, request_id, "late callback rejected, royalty already released");
            return Err(LedgerError::AlreadyReleased(sale_id));
        }
        self.verify(request_id, cleartexts, proof)?;

        let mut fields = decode_fields(cleartexts, 2)?.into_iter();
        let (Some(content_field), Some(amount_field)) = (fields.next(), fields.next()) else {
            return Err(LedgerError::MalformedPayload("missing field".into()));
        };
        let content_id = String::from_utf8(content_field)
            .map_err(|_| LedgerError::MalformedPayload("content id is not UTF-8".into()))?;
        let amount = parse_decimal_amount(&amount_field)?;

        let new_total = match self.totals.get(&content_id) {
            Some(total) => RunningTotal {
                handle: self.coprocessor.add(&total.handle, &sale.encrypted_amount)?,
                minted: true,
            },
            None => RunningTotal {
                handle: sale.encrypted_amount,
                minted: false,
            },
        };

        let royalty = DecryptedRoyalty::released(content_id.clone(), amount);
        self.royalties.insert(sale_id, royalty);
        match self.totals.insert(content_id.clone(), new_total) {
            None => self.content_index.push(content_id.clone()),
            // Queued total requests hold their own copy of the old ciphertext.
            Some(old) if old.minted => {
                self.coprocessor.discard(&old.handle);
            }
            Some(_) => {}
        }

        tracing::info!(sale_id, request_id, %content_id, amount, "royalty released");
        self.sink.emit(LedgerEvent::RoyaltyDecrypted {
            sale_id,
            content_id,
            amount,
        });
        Ok(sale_id)
    }

    // ------------------------------------------------------------------
    // Content totals
    // ------------------------------------------------------------------

    /// Ask the oracle to decrypt a content's running total.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContentNotFound`] if no released sale named `content_id`
    /// - [`LedgerError::Oracle`] if the oracle refuses the request
    pub fn request_content_total_decryption(&mut self, content_id: &str) -> Result<RequestId> {
        let total = self
            .totals
            .get(content_id)
            .ok_or_else(|| LedgerError::ContentNotFound(content_id.to_string()))?;
        let request_id = self
            .oracle
            .request_decryption(&[total.handle], CallbackSelector::ContentTotal)?;
        self.requests.insert(
            request_id,
            PendingRequest::ContentTotal(content_id.to_string()),
        );

        tracing::debug!(%content_id, request_id, "content total decryption requested");
        self.sink.emit(LedgerEvent::ContentTotalRequested {
            content_id: content_id.to_string(),
            request_id,
        });
        Ok(request_id)
    }

    /// Deliver the cleartext total for a content-total request.
    ///
    /// Read-only: the report is returned and emitted, and no ledger state
    /// changes. Delivering the same response twice yields the same report.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownRequest`] if the request was never issued here
    /// - [`LedgerError::CallbackMismatch`] if it was a sale request
    /// - [`LedgerError::ContentNotFound`] if the content has no totals entry
    /// - [`LedgerError::InvalidProof`] if the proof does not verify
    /// - [`LedgerError::MalformedPayload`] / [`LedgerError::MalformedAmount`]
    ///   on a bad payload
    pub fn on_content_total_callback(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> Result<ContentTotalReport> {
        let content_id = match self.pending_request(request_id)? {
            PendingRequest::ContentTotal(content_id) => content_id.clone(),
            other => {
                return Err(mismatch(
                    request_id,
                    other.selector(),
                    CallbackSelector::ContentTotal,
                ))
            }
        };
        if !self.totals.contains_key(&content_id) {
            return Err(LedgerError::ContentNotFound(content_id));
        }
        self.verify(request_id, cleartexts, proof)?;

        let total = decode_fields(cleartexts, 1)?
            .first()
            .map(|field| parse_decimal_total(field))
            .transpose()?
            .ok_or_else(|| LedgerError::MalformedPayload("missing field".into()))?;

        tracing::info!(request_id, %content_id, total, "content total decrypted");
        self.sink.emit(LedgerEvent::ContentTotalDecrypted {
            content_id: content_id.clone(),
            total,
        });
        Ok(ContentTotalReport {
            request_id,
            content_id,
            total,
        })
    }

    /// Route an oracle response to the callback its selector names.
    pub fn dispatch_callback(&mut self, response: &DecryptionResponse) -> Result<CallbackOutcome> {
        let DecryptionResponse {
            request_id,
            selector,
            cleartexts,
            proof,
        } = response;
        match selector {
            CallbackSelector::SaleRoyalty => {
                let sale_id = self.on_decryption_callback(*request_id, cleartexts, proof)?;
                let royalty = self.royalties.get(&sale_id).cloned().unwrap_or_default();
                Ok(CallbackOutcome::Royalty { sale_id, royalty })
            }
            CallbackSelector::ContentTotal => self
                .on_content_total_callback(*request_id, cleartexts, proof)
                .map(CallbackOutcome::ContentTotal),
        }
    }

    // ------------------------------------------------------------------
    // Access policy
    // ------------------------------------------------------------------

    pub fn authorize_recorder(&mut self, caller: &AccountId, account: AccountId) -> Result<bool> {
        let added = self.policy.authorize(caller, account)?;
        tracing::info!(account = %hex::encode(account), added, "recorder authorized");
        Ok(added)
    }

    pub fn revoke_recorder(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool> {
        let removed = self.policy.revoke(caller, account)?;
        tracing::info!(account = %hex::encode(account), removed, "recorder revoked");
        Ok(removed)
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The royalty record for a sale. A pending placeholder means "not yet
    /// available", not a zero royalty.
    pub fn get_decrypted_royalty(&self, sale_id: SaleId) -> Option<&DecryptedRoyalty> {
        self.royalties.get(&sale_id)
    }

    /// The current total's handle. A later release for the same content may
    /// replace and discard it.
    pub fn get_encrypted_content_total(&self, content_id: &str) -> Option<CiphertextHandle> {
        self.totals.get(content_id).map(|total| total.handle)
    }

    pub fn get_sale(&self, sale_id: SaleId) -> Option<&EncryptedSale> {
        self.sales.get(&sale_id)
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    /// Content identifiers with a running total, in first-release order.
    pub fn content_ids(&self) -> &[String] {
        &self.content_index
    }

    /// The request-tracking entry for `request_id`.
    pub fn get_pending_request(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.requests.get(&request_id)
    }

    /// Tracked requests whose target is still unresolved: sale requests for
    /// unreleased sales, and every content-total request.
    pub fn outstanding_requests(&self) -> Vec<(RequestId, PendingRequest)> {
        let mut out: Vec<(RequestId, PendingRequest)> = self
            .requests
            .iter()
            .filter(|(_, request)| match request {
                PendingRequest::Sale(sale_id) => !self.is_released(*sale_id),
                PendingRequest::ContentTotal(_) => true,
            })
            .map(|(id, request)| (*id, request.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn is_released(&self, sale_id: SaleId) -> bool {
        self.royalties
            .get(&sale_id)
            .is_some_and(|royalty| royalty.released)
    }

    fn pending_request(&self, request_id: RequestId) -> Result<&PendingRequest> {
        self.requests.get(&request_id).ok_or_else(|| {
            tracing::warn!(request_id, "callback for unknown request");
            LedgerError::UnknownRequest(request_id)
        })
    }

    fn verify(&self, request_id: RequestId, cleartexts: &[u8], proof: &DecryptionProof) -> Result<()> {
        self.oracle
            .check_signatures(request_id, cleartexts, proof)
            .map_err(|e| match e {
                OracleError::InvalidProof(reason) => {
                    tracing::warn!(request_id, %reason, "decryption proof rejected");
                    LedgerError::InvalidProof(reason)
                }
                other => other.into(),
            })
    }
}

fn mismatch(
    request_id: RequestId,
    expected: CallbackSelector,
    actual: CallbackSelector,
) -> LedgerError {
    tracing::warn!(request_id, ?expected, ?actual, "callback delivered to wrong entry point");
    LedgerError::CallbackMismatch {
        request_id,
        expected,
        actual,
    }
}

fn expect_kind(field: &'static str, handle: &CiphertextHandle, expected: ValueKind) -> Result<()> {
    if handle.kind() == expected {
        return Ok(());
    }
    tracing::warn!(field, %handle, "sale rejected, wrong handle kind");
    Err(LedgerError::HandleKind {
        field,
        expected,
        actual: handle.kind(),
    })
}

fn decode_fields(cleartexts: &[u8], expected: usize) -> Result<Vec<Vec<u8>>> {
    payload::decode(cleartexts, expected).map_err(|e| match e {
        OracleError::MalformedPayload(reason) => LedgerError::MalformedPayload(reason),
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sink::EventLog;
    use tessera_crypto::ed25519::SigningKey;
    use tessera_crypto::elgamal::KeyPair;
    use tessera_oracle::payload::Cleartext;
    use tessera_oracle::{proof, LocalOracle, OracleConfig};

    const OWNER: AccountId = [7u8; 32];
    const SIGNER_SEED: [u8; 32] = [42u8; 32];

    struct Harness {
        oracle: Arc<LocalOracle>,
        log: Arc<EventLog>,
        ledger: RoyaltyLedger,
    }

    impl Harness {
        fn new() -> Self {
            let config = OracleConfig {
                dlog_table_bits: 10,
                max_giant_steps: 1 << 10,
                ..OracleConfig::default()
            };
            let oracle = Arc::new(
                LocalOracle::with_keys(
                    KeyPair::generate(),
                    vec![SigningKey::from_bytes(&SIGNER_SEED)],
                    &config,
                )
                .expect("oracle"),
            );
            let log = Arc::new(EventLog::new());
            let ledger = RoyaltyLedger::new(
                oracle.coprocessor(),
                oracle.clone(),
                log.clone(),
                AccessPolicy::new(OWNER),
            )
            .with_clock(Arc::new(ManualClock::new(1_700_000_000)));
            Self {
                oracle,
                log,
                ledger,
            }
        }

        fn record(&mut self, amount: u64, content: &str) -> SaleId {
            let coprocessor = self.oracle.coprocessor();
            let amount = coprocessor.encrypt_u64(amount).expect("encrypt amount");
            let content = coprocessor
                .encrypt_bytes(content.as_bytes())
                .expect("encrypt content");
            self.ledger
                .record_sale(&OWNER, amount, content)
                .expect("record sale")
        }

        fn release(&mut self, sale_id: SaleId) -> DecryptionResponse {
            let request_id = self
                .ledger
                .request_sale_decryption(sale_id)
                .expect("request");
            let response = self.oracle.fulfil(request_id).expect("fulfil");
            self.ledger.dispatch_callback(&response).expect("callback");
            response
        }

        fn total(&mut self, content: &str) -> u64 {
            let request_id = self
                .ledger
                .request_content_total_decryption(content)
                .expect("request total");
            let response = self.oracle.fulfil(request_id).expect("fulfil");
            let CallbackOutcome::ContentTotal(report) =
                self.ledger.dispatch_callback(&response).expect("callback")
            else {
                unreachable!("content-total request yields a content-total outcome")
            };
            report.total
        }
    }

    /// Sign an arbitrary payload with the harness signer.
    fn forged(request_id: RequestId, fields: &[Cleartext]) -> (Vec<u8>, DecryptionProof) {
        let cleartexts = payload::encode(fields);
        let proof = proof::sign(
            &[SigningKey::from_bytes(&SIGNER_SEED)],
            request_id,
            &cleartexts,
        );
        (cleartexts, proof)
    }

    #[test]
    fn test_sequential_sale_ids() {
        let mut h = Harness::new();
        let ids: Vec<SaleId> = (0..4).map(|i| h.record(i, "movie-1")).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(h.ledger.sale_count(), 4);
        assert_eq!(
            h.ledger.get_sale(2).expect("sale").created_at,
            1_700_000_000
        );
    }

    #[test]
    fn test_new_sale_has_pending_placeholder() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        assert_eq!(
            h.ledger.get_decrypted_royalty(sale_id),
            Some(&DecryptedRoyalty::pending())
        );
        assert!(h.ledger.get_decrypted_royalty(99).is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        assert_eq!(sale_id, 1);
        h.release(sale_id);

        assert_eq!(
            h.ledger.get_decrypted_royalty(1),
            Some(&DecryptedRoyalty::released("movie-1".into(), 100))
        );
        assert_eq!(h.ledger.content_ids(), &["movie-1".to_string()]);
        assert_eq!(h.total("movie-1"), 100);
    }

    #[test]
    fn test_events_in_order() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        h.release(sale_id);
        let events = h.log.events();
        assert_eq!(
            events,
            vec![
                LedgerEvent::SaleRecorded {
                    sale_id: 1,
                    timestamp: 1_700_000_000
                },
                LedgerEvent::DecryptionRequested {
                    sale_id: 1,
                    request_id: 1
                },
                LedgerEvent::RoyaltyDecrypted {
                    sale_id: 1,
                    content_id: "movie-1".into(),
                    amount: 100
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_request_after_release() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        h.release(sale_id);
        let before = h.log.len();
        assert!(matches!(
            h.ledger.request_sale_decryption(sale_id),
            Err(LedgerError::AlreadyDecrypted(1))
        ));
        assert_eq!(h.log.len(), before);
        assert_eq!(h.oracle.pending_count().expect("count"), 0);
    }

    #[test]
    fn test_request_unknown_sale() {
        let mut h = Harness::new();
        assert!(matches!(
            h.ledger.request_sale_decryption(1),
            Err(LedgerError::SaleNotFound(1))
        ));
    }

    #[test]
    fn test_racing_callbacks_first_wins() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        let first = h.ledger.request_sale_decryption(sale_id).expect("request");
        let second = h.ledger.request_sale_decryption(sale_id).expect("request");
        assert_ne!(first, second);

        let late = h.oracle.fulfil(first).expect("fulfil");
        let early = h.oracle.fulfil(second).expect("fulfil");
        h.ledger.dispatch_callback(&early).expect("first callback");
        let snapshot = h.ledger.get_decrypted_royalty(sale_id).cloned();

        assert!(matches!(
            h.ledger.dispatch_callback(&late),
            Err(LedgerError::AlreadyReleased(1))
        ));
        assert_eq!(h.ledger.get_decrypted_royalty(sale_id).cloned(), snapshot);
        assert_eq!(h.total("movie-1"), 100);
    }

    #[test]
    fn test_replayed_callback_rejected() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        let response = h.release(sale_id);
        assert!(matches!(
            h.ledger.dispatch_callback(&response),
            Err(LedgerError::AlreadyReleased(_))
        ));
    }

    #[test]
    fn test_unknown_request() {
        let mut h = Harness::new();
        let (cleartexts, proof) = forged(9, &[Cleartext::U64(1)]);
        assert!(matches!(
            h.ledger.on_decryption_callback(9, &cleartexts, &proof),
            Err(LedgerError::UnknownRequest(9))
        ));
        assert!(matches!(
            h.ledger.on_content_total_callback(9, &cleartexts, &proof),
            Err(LedgerError::UnknownRequest(9))
        ));
    }

    #[test]
    fn test_invalid_proof_leaves_state() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        let request_id = h.ledger.request_sale_decryption(sale_id).expect("request");
        let mut response = h.oracle.fulfil(request_id).expect("fulfil");
        response.proof = DecryptionProof::default();

        assert!(matches!(
            h.ledger.dispatch_callback(&response),
            Err(LedgerError::InvalidProof(_))
        ));
        assert!(!h.ledger.get_decrypted_royalty(sale_id).expect("royalty").released);
        assert!(h.ledger.content_ids().is_empty());
    }

    #[test]
    fn test_malformed_amount_aborts() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        let request_id = h.ledger.request_sale_decryption(sale_id).expect("request");
        let (cleartexts, proof) = forged(
            request_id,
            &[
                Cleartext::Bytes(b"movie-1".to_vec()),
                Cleartext::Bytes(b"12a".to_vec()),
            ],
        );
        let before = h.log.len();

        assert!(matches!(
            h.ledger.on_decryption_callback(request_id, &cleartexts, &proof),
            Err(LedgerError::MalformedAmount(_))
        ));
        assert_eq!(
            h.ledger.get_decrypted_royalty(sale_id),
            Some(&DecryptedRoyalty::pending())
        );
        assert!(h.ledger.get_encrypted_content_total("movie-1").is_none());
        assert_eq!(h.log.len(), before);
    }

    #[test]
    fn test_leading_zero_amount_accepted() {
        let mut h = Harness::new();
        let sale_id = h.record(42, "movie-1");
        let request_id = h.ledger.request_sale_decryption(sale_id).expect("request");
        let (cleartexts, proof) = forged(
            request_id,
            &[
                Cleartext::Bytes(b"movie-1".to_vec()),
                Cleartext::Bytes(b"042".to_vec()),
            ],
        );
        h.ledger
            .on_decryption_callback(request_id, &cleartexts, &proof)
            .expect("callback");
        assert_eq!(h.ledger.get_decrypted_royalty(sale_id).expect("royalty").amount, 42);
    }

    #[test]
    fn test_wrong_field_count() {
        let mut h = Harness::new();
        let sale_id = h.record(5, "movie-1");
        let request_id = h.ledger.request_sale_decryption(sale_id).expect("request");
        let (cleartexts, proof) = forged(request_id, &[Cleartext::U64(5)]);
        assert!(matches!(
            h.ledger.on_decryption_callback(request_id, &cleartexts, &proof),
            Err(LedgerError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_totals_accumulate_per_content() {
        let mut h = Harness::new();
        let a = h.record(100, "movie-1");
        let b = h.record(30, "movie-2");
        let c = h.record(25, "movie-1");
        for sale in [a, b, c] {
            h.release(sale);
        }
        assert_eq!(
            h.ledger.content_ids(),
            &["movie-1".to_string(), "movie-2".to_string()]
        );
        assert_eq!(h.total("movie-1"), 125);
        assert_eq!(h.total("movie-2"), 30);
    }

    #[test]
    fn test_total_delta_matches_amount() {
        let mut h = Harness::new();
        let first = h.record(100, "movie-1");
        h.release(first);
        let before = h.total("movie-1");
        let second = h.record(17, "movie-1");
        h.release(second);
        assert_eq!(h.total("movie-1") - before, 17);
    }

    #[test]
    fn test_unknown_content_total() {
        let mut h = Harness::new();
        assert!(matches!(
            h.ledger.request_content_total_decryption("no-such-content"),
            Err(LedgerError::ContentNotFound(_))
        ));
    }

    #[test]
    fn test_content_total_callback_is_read_only() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        h.release(sale_id);
        let handle = h.ledger.get_encrypted_content_total("movie-1");
        let request_id = h
            .ledger
            .request_content_total_decryption("movie-1")
            .expect("request");
        let response = h.oracle.fulfil(request_id).expect("fulfil");

        let first = h.ledger.dispatch_callback(&response).expect("callback");
        let second = h.ledger.dispatch_callback(&response).expect("callback");
        assert_eq!(first, second);
        assert_eq!(h.ledger.get_encrypted_content_total("movie-1"), handle);
        assert_eq!(
            h.log.events().last(),
            Some(&LedgerEvent::ContentTotalDecrypted {
                content_id: "movie-1".into(),
                total: 100
            })
        );
    }

    #[test]
    fn test_callback_kind_mismatch() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        h.release(sale_id);
        let request_id = h
            .ledger
            .request_content_total_decryption("movie-1")
            .expect("request");
        let response = h.oracle.fulfil(request_id).expect("fulfil");
        assert!(matches!(
            h.ledger
                .on_decryption_callback(request_id, &response.cleartexts, &response.proof),
            Err(LedgerError::CallbackMismatch {
                expected: CallbackSelector::ContentTotal,
                actual: CallbackSelector::SaleRoyalty,
                ..
            })
        ));
    }

    #[test]
    fn test_idempotent_read() {
        let mut h = Harness::new();
        let sale_id = h.record(100, "movie-1");
        h.release(sale_id);
        let first = h.ledger.get_decrypted_royalty(sale_id).cloned();
        let second = h.ledger.get_decrypted_royalty(sale_id).cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unauthorized_recorder() {
        let mut h = Harness::new();
        let coprocessor = h.oracle.coprocessor();
        let amount = coprocessor.encrypt_u64(1).expect("encrypt");
        let content = coprocessor.encrypt_bytes(b"x").expect("encrypt");
        let stranger = [9u8; 32];

        assert!(matches!(
            h.ledger.record_sale(&stranger, amount, content),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(h.ledger.sale_count(), 0);

        h.ledger
            .authorize_recorder(&OWNER, stranger)
            .expect("authorize");
        assert_eq!(
            h.ledger
                .record_sale(&stranger, amount, content)
                .expect("record"),
            1
        );
        h.ledger.revoke_recorder(&OWNER, &stranger).expect("revoke");
        assert!(h.ledger.record_sale(&stranger, amount, content).is_err());
    }

    #[test]
    fn test_oracle_rejection_leaves_no_request() {
        let mut h = Harness::new();
        let amount = CiphertextHandle::new([0u8; 32], ValueKind::U64);
        let content = CiphertextHandle::new([0u8; 32], ValueKind::Bytes);
        let sale_id = h
            .ledger
            .record_sale(&OWNER, amount, content)
            .expect("record");
        assert!(matches!(
            h.ledger.request_sale_decryption(sale_id),
            Err(LedgerError::Oracle(OracleError::UnknownHandle(_)))
        ));
        assert!(h.ledger.outstanding_requests().is_empty());
    }

    #[test]
    fn test_outstanding_requests() {
        let mut h = Harness::new();
        let a = h.record(1, "movie-1");
        let b = h.record(2, "movie-1");
        h.release(a);
        let pending = h.ledger.request_sale_decryption(b).expect("request");
        assert_eq!(
            h.ledger.outstanding_requests(),
            vec![(pending, PendingRequest::Sale(b))]
        );
    }

    #[test]
    fn test_wrong_handle_kinds_rejected() {
        let mut h = Harness::new();
        let coprocessor = h.oracle.coprocessor();
        let bytes_amount = coprocessor.encrypt_bytes(b"100").expect("encrypt");
        let content = coprocessor.encrypt_bytes(b"movie-1").expect("encrypt");
        let numeric_content = coprocessor.encrypt_u64(1).expect("encrypt");
        let amount = coprocessor.encrypt_u64(100).expect("encrypt");

        assert!(matches!(
            h.ledger.record_sale(&OWNER, bytes_amount, content),
            Err(LedgerError::HandleKind {
                field: "amount",
                expected: ValueKind::U64,
                actual: ValueKind::Bytes,
            })
        ));
        assert!(matches!(
            h.ledger.record_sale(&OWNER, amount, numeric_content),
            Err(LedgerError::HandleKind {
                field: "content_id",
                expected: ValueKind::Bytes,
                actual: ValueKind::U64,
            })
        ));
        assert_eq!(h.ledger.sale_count(), 0);
        assert!(h.log.is_empty());

        // The content total stays numeric and keeps accumulating.
        let first = h.record(100, "movie-1");
        h.release(first);
        let second = h.record(50, "movie-1");
        h.release(second);
        assert_eq!(first, 1);
        assert_eq!(
            h.ledger
                .get_encrypted_content_total("movie-1")
                .expect("total")
                .kind(),
            ValueKind::U64
        );
        assert_eq!(h.total("movie-1"), 150);
    }

    #[test]
    fn test_replaced_totals_are_discarded() {
        let mut h = Harness::new();
        let coprocessor = h.oracle.coprocessor();
        let sales: Vec<SaleId> = [10, 20, 30, 40]
            .into_iter()
            .map(|amount| h.record(amount, "movie-1"))
            .collect();
        assert_eq!(coprocessor.len(), 8);

        h.release(sales[0]);
        let seeded = h.ledger.get_encrypted_content_total("movie-1").expect("total");
        h.release(sales[1]);
        // The seed is sale 1's own amount and stays stored.
        assert!(coprocessor.contains(&seeded));
        assert_eq!(coprocessor.len(), 9);

        let second = h.ledger.get_encrypted_content_total("movie-1").expect("total");
        let queued = h
            .ledger
            .request_content_total_decryption("movie-1")
            .expect("request total");
        h.release(sales[2]);
        h.release(sales[3]);
        assert!(!coprocessor.contains(&second));
        assert_eq!(coprocessor.len(), 9);

        // A request queued before the replacement still decrypts its snapshot.
        let response = h.oracle.fulfil(queued).expect("fulfil");
        let CallbackOutcome::ContentTotal(report) =
            h.ledger.dispatch_callback(&response).expect("callback")
        else {
            unreachable!("content-total request yields a content-total outcome")
        };
        assert_eq!(report.total, 30);
        assert_eq!(h.total("movie-1"), 100);
    }
}
