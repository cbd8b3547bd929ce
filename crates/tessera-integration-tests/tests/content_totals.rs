//! Integration test: encrypted per-content running totals.
//!
//! Covers:
//! 1. Totals grow by exactly the released amount
//! 2. Totals are kept per content id
//! 3. Decrypting a total is read-only and repeatable
//! 4. Unknown content ids are rejected
//! 5. Totals past the oracle's decryption bound are dropped at fulfilment
//! 6. Replaced totals do not accumulate in the coprocessor

use tessera_crypto::CryptoError;
use tessera_ledger::{CallbackOutcome, LedgerError};
use tessera_oracle::{Coprocessor, OracleError};
use tessera_types::{LedgerEvent, PendingRequest};

use tessera_integration_tests::Fixture;

#[tokio::test]
async fn total_grows_by_released_amount() {
    let mut fx = Fixture::new();
    let first = fx.record_sale(250, "album-7");
    fx.release(first);
    let before = fx.decrypt_total("album-7");

    let second = fx.record_sale(75, "album-7");
    // Recording alone does not touch the total.
    assert_eq!(fx.decrypt_total("album-7"), before);

    fx.release(second);
    let after = fx.decrypt_total("album-7");
    assert_eq!(after - before, 75);
    assert_eq!(after, 325);
}

#[tokio::test]
async fn totals_are_kept_per_content() {
    let mut fx = Fixture::new();
    for (amount, content) in [(10, "a"), (20, "b"), (30, "a"), (0, "c")] {
        let sale_id = fx.record_sale(amount, content);
        fx.release(sale_id);
    }

    assert_eq!(fx.decrypt_total("a"), 40);
    assert_eq!(fx.decrypt_total("b"), 20);
    // A zero sale still creates an index entry and a total.
    assert_eq!(fx.decrypt_total("c"), 0);
    assert_eq!(
        fx.ledger.content_ids(),
        &["a".to_string(), "b".to_string(), "c".to_string()]
    );

    let a = fx.ledger.get_encrypted_content_total("a").expect("total for a");
    let b = fx.ledger.get_encrypted_content_total("b").expect("total for b");
    assert_ne!(a, b);
}

#[tokio::test]
async fn total_decryption_is_read_only() {
    let mut fx = Fixture::new();
    let sale_id = fx.record_sale(500, "song-3");
    fx.release(sale_id);
    let handle = fx.ledger.get_encrypted_content_total("song-3");

    let request_id = fx
        .ledger
        .request_content_total_decryption("song-3")
        .expect("Total decryption request should succeed");
    assert_eq!(
        fx.ledger.get_pending_request(request_id),
        Some(&PendingRequest::ContentTotal("song-3".into()))
    );
    let response = fx.fulfil(request_id);

    // The same response may be delivered repeatedly.
    for _ in 0..2 {
        let report = fx
            .ledger
            .on_content_total_callback(request_id, &response.cleartexts, &response.proof)
            .expect("Total callback should be accepted");
        assert_eq!(report.content_id, "song-3");
        assert_eq!(report.total, 500);
    }
    assert_eq!(fx.ledger.get_encrypted_content_total("song-3"), handle);
    assert_eq!(fx.ledger.content_ids(), &["song-3".to_string()]);

    let reports = fx
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, LedgerEvent::ContentTotalDecrypted { .. }))
        .count();
    assert_eq!(reports, 2);

    match fx
        .ledger
        .dispatch_callback(&response)
        .expect("Dispatch should route to the total callback")
    {
        CallbackOutcome::ContentTotal(report) => assert_eq!(report.request_id, request_id),
        CallbackOutcome::Royalty { .. } => unreachable!("content-total request"),
    }
}

#[tokio::test]
async fn unknown_content_is_rejected() {
    let mut fx = Fixture::new();
    let result = fx.ledger.request_content_total_decryption("no-such-content");
    assert!(matches!(result, Err(LedgerError::ContentNotFound(_))));

    // Recorded but unreleased sales do not create a total either.
    fx.record_sale(10, "pending-only");
    let result = fx.ledger.request_content_total_decryption("pending-only");
    assert!(matches!(result, Err(LedgerError::ContentNotFound(_))));
    assert_eq!(fx.oracle.pending_count().expect("pending"), 0);
}

#[tokio::test]
async fn sale_callback_cannot_target_total_request() {
    let mut fx = Fixture::new();
    let sale_id = fx.record_sale(42, "movie-9");
    fx.release(sale_id);

    let request_id = fx
        .ledger
        .request_content_total_decryption("movie-9")
        .expect("Total decryption request should succeed");
    let response = fx.fulfil(request_id);

    let result =
        fx.ledger
            .on_decryption_callback(request_id, &response.cleartexts, &response.proof);
    assert!(matches!(result, Err(LedgerError::CallbackMismatch { .. })));
    assert_eq!(fx.decrypt_total("movie-9"), 42);
}

#[tokio::test]
async fn total_past_decryption_bound_is_dropped() {
    let mut fx = Fixture::new();
    let bound = fx.oracle.decryption_bound();
    assert_eq!(bound, 1 << 20);

    // Each amount decrypts on its own; their sum does not.
    let first = fx.record_sale(600_000, "blockbuster");
    let second = fx.record_sale(600_000, "blockbuster");
    fx.release(first);
    fx.release(second);

    let request_id = fx
        .ledger
        .request_content_total_decryption("blockbuster")
        .expect("Total decryption request should succeed");
    assert!(matches!(
        fx.oracle.fulfil(request_id),
        Err(OracleError::Crypto(CryptoError::DiscreteLogOutOfRange { bound: 1_048_576 }))
    ));
    assert_eq!(fx.oracle.pending_count().expect("pending"), 0);
    assert_eq!(
        fx.ledger.outstanding_requests(),
        vec![(request_id, PendingRequest::ContentTotal("blockbuster".into()))]
    );
    assert!(!fx
        .events
        .events()
        .iter()
        .any(|e| matches!(e, LedgerEvent::ContentTotalDecrypted { .. })));
}

#[tokio::test]
async fn replaced_totals_do_not_accumulate() {
    let mut fx = Fixture::new();
    let coprocessor = fx.oracle.coprocessor();
    let mut previous = None;

    for round in 0..10u64 {
        let sale_id = fx.record_sale(round + 1, "series-4");
        fx.release(sale_id);
        let current = fx
            .ledger
            .get_encrypted_content_total("series-4")
            .expect("Total should exist after release");
        if round >= 2 {
            let previous = previous.expect("previous total");
            assert!(!coprocessor.contains(&previous));
        }
        previous = Some(current);
    }

    // Two handles per sale, plus the one live minted total.
    assert_eq!(coprocessor.len(), 2 * 10 + 1);
    assert_eq!(fx.decrypt_total("series-4"), 55);
}
