//! Integration tests for the Tessera royalty ledger.
//!
//! The library holds fixtures shared by the scenarios under `tests/`: a
//! ledger wired to an in-process oracle with a small discrete-log table, a
//! known signer key, and a manual clock.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p tessera-integration-tests
//! ```

use std::sync::Arc;

use tessera_crypto::ed25519::SigningKey;
use tessera_crypto::elgamal::KeyPair;
use tessera_ledger::{AccessPolicy, CallbackOutcome, EventLog, ManualClock, RoyaltyLedger};
use tessera_oracle::{Coprocessor, LocalOracle, OracleConfig};
use tessera_types::{AccountId, DecryptionResponse, RequestId, SaleId};

/// Base timestamp for test scenarios.
pub const BASE_TIME: u64 = 1_700_000_000;

/// Owner of every fixture ledger.
pub const OWNER: AccountId = [0x0a; 32];

/// Seeds of the fixture's oracle signers.
pub const SIGNER_SEEDS: [[u8; 32]; 3] = [[0x51; 32], [0x52; 32], [0x53; 32]];

/// Signatures required by the fixture's oracle.
pub const SIGNER_THRESHOLD: usize = 2;

/// A ledger, its oracle, and what it emitted.
pub struct Fixture {
    pub oracle: Arc<LocalOracle>,
    pub events: Arc<EventLog>,
    pub clock: Arc<ManualClock>,
    pub ledger: RoyaltyLedger,
}

/// The fixture's signer keys.
pub fn signer_keys() -> Vec<SigningKey> {
    SIGNER_SEEDS.iter().map(SigningKey::from_bytes).collect()
}

/// Oracle parameters covering plaintexts below 2^20.
pub fn small_oracle_config() -> OracleConfig {
    OracleConfig {
        dlog_table_bits: 10,
        max_giant_steps: 1 << 10,
        signer_count: SIGNER_SEEDS.len(),
        signer_threshold: SIGNER_THRESHOLD,
    }
}

impl Fixture {
    pub fn new() -> Self {
        let oracle = Arc::new(
            LocalOracle::with_keys(
                KeyPair::from_seed(&[0x77; 32]),
                signer_keys(),
                &small_oracle_config(),
            )
            .expect("Oracle construction should succeed"),
        );
        let events = Arc::new(EventLog::new());
        let clock = Arc::new(ManualClock::new(BASE_TIME));
        let ledger = RoyaltyLedger::new(
            oracle.coprocessor(),
            oracle.clone(),
            events.clone(),
            AccessPolicy::new(OWNER),
        )
        .with_clock(clock.clone());
        Self {
            oracle,
            events,
            clock,
            ledger,
        }
    }

    /// Encrypt `(amount, content_id)` and record the sale as the owner.
    pub fn record_sale(&mut self, amount: u64, content_id: &str) -> SaleId {
        let coprocessor = self.oracle.coprocessor();
        let amount = coprocessor
            .encrypt_u64(amount)
            .expect("Amount encryption should succeed");
        let content = coprocessor
            .encrypt_bytes(content_id.as_bytes())
            .expect("Content id encryption should succeed");
        self.ledger
            .record_sale(&OWNER, amount, content)
            .expect("Recording a sale should succeed")
    }

    /// Fulfil one queued request at the oracle.
    pub fn fulfil(&self, request_id: RequestId) -> DecryptionResponse {
        self.oracle
            .fulfil(request_id)
            .expect("Oracle fulfilment should succeed")
    }

    /// Request, fulfil, and deliver a sale decryption.
    pub fn release(&mut self, sale_id: SaleId) -> DecryptionResponse {
        let request_id = self
            .ledger
            .request_sale_decryption(sale_id)
            .expect("Decryption request should succeed");
        let response = self.fulfil(request_id);
        self.ledger
            .dispatch_callback(&response)
            .expect("Callback should be accepted");
        response
    }

    /// Decrypt a content's running total through the oracle.
    pub fn decrypt_total(&mut self, content_id: &str) -> u64 {
        let request_id = self
            .ledger
            .request_content_total_decryption(content_id)
            .expect("Total decryption request should succeed");
        let response = self.fulfil(request_id);
        match self
            .ledger
            .dispatch_callback(&response)
            .expect("Total callback should be accepted")
        {
            CallbackOutcome::ContentTotal(report) => report.total,
            CallbackOutcome::Royalty { .. } => unreachable!("content-total request"),
        }
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
