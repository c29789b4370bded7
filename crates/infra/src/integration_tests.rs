//! Integration tests for the full posting pipeline.
//!
//! Tests: movement → guardrails → line builder → balance → journal write →
//! posting link, through the real orchestrator against the in-memory store.
//!
//! Verifies:
//! - posting produces balanced journals with full lineage metadata
//! - idempotency (second post is a skip; one journal per source, always)
//! - guardrail short-circuit writes nothing
//! - write/link failure handling (retry vs. orphan + reconcile)
//! - batch fan-out isolates per-item failures

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ledgerbridge_core::{Currency, LocationId, MovementId, OrganizationId, ProductId};
use ledgerbridge_domain::{
    GLAccount, GLAccountMap, JournalStatus, MovementLine, MovementTransaction, MovementType, Side,
    SkipReason, SkippedLine, GL_JOURNAL, POSTING_TYPE_AUTO,
};
use ledgerbridge_engine::{
    BatchOrchestrator, GuardrailViolation, PostingError, PostingOrchestrator, PostingOutcome,
    ReconcileOutcome, SkipCause,
};

use crate::in_memory::{InMemoryLedgerStore, OrgConfig};

type Store = Arc<InMemoryLedgerStore>;
type Orchestrator = PostingOrchestrator<Store, Store, Store>;

fn aed() -> Currency {
    Currency::new("AED").unwrap()
}

fn test_accounts() -> GLAccountMap {
    GLAccountMap {
        inventory_asset: GLAccount::new("1300", "Inventory Asset"),
        inventory_clearing: GLAccount::new("2150", "Inventory Clearing"),
        cogs: GLAccount::new("5100", "Cost of Goods Sold"),
        inventory_adjustment: GLAccount::new("5900", "Inventory Adjustment"),
    }
}

fn setup() -> (Store, Orchestrator, OrganizationId) {
    ledgerbridge_observability::init();
    let store = Arc::new(InMemoryLedgerStore::new());
    let org = OrganizationId::new();
    store.seed_config(
        org,
        OrgConfig {
            accounts: test_accounts(),
            currencies: vec![aed()],
            closed_periods: HashSet::new(),
        },
    );
    let orchestrator = PostingOrchestrator::new(store.clone(), store.clone(), store.clone());
    (store, orchestrator, org)
}

fn seed_movement(
    store: &Store,
    org: OrganizationId,
    movement_type: MovementType,
    quantity: Decimal,
    unit_cost: Decimal,
) -> MovementId {
    let id = MovementId::new();
    store.seed_movement(MovementTransaction {
        id,
        organization_id: org,
        movement_type,
        transaction_number: format!("MOV-{}", id),
        transaction_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        currency: aed(),
        lines: vec![MovementLine {
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            quantity,
            unit_cost,
            amount: quantity * unit_cost,
            description: None,
        }],
    });
    id
}

#[test]
fn receipt_posts_a_balanced_journal_with_lineage() {
    // Scenario: receipt of 100 units @ 12.50 AED.
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(100), dec!(12.50));

    let outcome = orchestrator.post(org, movement_id).unwrap();
    let journal_id = outcome.created_journal_id().expect("should post");

    let journals = store.journals();
    assert_eq!(journals.len(), 1);
    let journal = &journals[0];

    assert_eq!(journal.id, journal_id);
    assert_eq!(journal.entry_type, GL_JOURNAL);
    assert_eq!(journal.status, JournalStatus::Posted);
    assert_eq!(journal.total_amount, dec!(1250.00));

    assert_eq!(journal.lines.len(), 2);
    assert_eq!(journal.lines[0].side, Side::Debit);
    assert_eq!(journal.lines[0].account_code, "1300");
    assert_eq!(journal.lines[0].amount, dec!(1250.00));
    assert_eq!(journal.lines[1].side, Side::Credit);
    assert_eq!(journal.lines[1].account_code, "2150");
    assert_eq!(journal.lines[1].amount, dec!(1250.00));

    let meta = &journal.metadata;
    assert_eq!(meta.source_transaction_id, movement_id);
    assert_eq!(meta.source_transaction_type, "receipt");
    assert_eq!(meta.posting_type, POSTING_TYPE_AUTO);
    assert_eq!(meta.total_dr, dec!(1250.00));
    assert_eq!(meta.total_cr, dec!(1250.00));
    assert!(meta.fiscal_period_validated);
    assert!(meta.currency_validated);
    assert!(meta.balance_validated);

    assert_eq!(store.link_count(), 1);
}

#[test]
fn issue_debits_cogs_and_credits_inventory() {
    // Scenario: issue of 40 units @ 12.50 AED.
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Issue, dec!(40), dec!(12.50));

    orchestrator.post(org, movement_id).unwrap();

    let journal = &store.journals()[0];
    assert_eq!(journal.lines[0].side, Side::Debit);
    assert_eq!(journal.lines[0].account_code, "5100");
    assert_eq!(journal.lines[0].amount, dec!(500.00));
    assert_eq!(journal.lines[1].side, Side::Credit);
    assert_eq!(journal.lines[1].account_code, "1300");
    assert_eq!(journal.lines[1].amount, dec!(500.00));
}

#[test]
fn metadata_keys_are_stable() {
    // The serialized key names are consumed by audit tooling; renaming one
    // is a breaking change even if the Rust field still exists.
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(1), dec!(10));
    orchestrator.post(org, movement_id).unwrap();

    let value = serde_json::to_value(&store.journals()[0].metadata).unwrap();
    let object = value.as_object().unwrap();
    for key in [
        "finance_dna_version",
        "source_transaction_id",
        "source_transaction_type",
        "source_transaction_number",
        "posting_type",
        "total_dr",
        "total_cr",
        "currency",
        "fiscal_period_validated",
        "currency_validated",
        "balance_validated",
    ] {
        assert!(object.contains_key(key), "missing metadata key {key}");
    }
}

#[test]
fn skipped_lines_are_recorded_in_the_posted_journal() {
    // A movement mixing unclassifiable and postable lines still posts, and
    // the skip is carried in the journal's metadata rather than vanishing.
    let (store, orchestrator, org) = setup();
    let movement_id = MovementId::new();
    store.seed_movement(MovementTransaction {
        id: movement_id,
        organization_id: org,
        movement_type: MovementType::Adjustment,
        transaction_number: "ADJ-0007".to_string(),
        transaction_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        currency: aed(),
        lines: vec![
            MovementLine {
                product_id: ProductId::new(),
                location_id: LocationId::new(),
                quantity: Decimal::ZERO,
                unit_cost: dec!(20),
                amount: Decimal::ZERO,
                description: None,
            },
            MovementLine {
                product_id: ProductId::new(),
                location_id: LocationId::new(),
                quantity: dec!(3),
                unit_cost: dec!(10),
                amount: dec!(30),
                description: None,
            },
        ],
    });

    let outcome = orchestrator.post(org, movement_id).unwrap();
    assert!(outcome.created_journal_id().is_some());

    let journal = &store.journals()[0];
    assert_eq!(journal.lines.len(), 2);
    assert_eq!(journal.total_amount, dec!(30));

    assert_eq!(
        journal.metadata.skipped_lines,
        vec![SkippedLine {
            line_index: 0,
            reason: SkipReason::Unclassifiable {
                movement_type: MovementType::Adjustment
            },
        }]
    );

    // The skip also survives serialization, where audit tooling reads it.
    let value = serde_json::to_value(&journal.metadata).unwrap();
    let skipped = value["skipped_lines"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["line_index"], 0);
}

#[test]
fn posting_twice_creates_one_journal() {
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    let first = orchestrator.post(org, movement_id).unwrap();
    let journal_id = first.created_journal_id().unwrap();

    let second = orchestrator.post(org, movement_id).unwrap();
    match second {
        PostingOutcome::Skipped(SkipCause::AlreadyPosted { journal_entry_id }) => {
            assert_eq!(journal_entry_id, journal_id);
        }
        other => panic!("expected AlreadyPosted skip, got {other:?}"),
    }

    assert_eq!(store.journal_count(), 1);
    assert_eq!(store.link_count(), 1);
}

#[test]
fn missing_movement_is_not_found() {
    let (_store, orchestrator, org) = setup();
    let err = orchestrator.post(org, MovementId::new()).unwrap_err();
    assert!(matches!(err, PostingError::NotFound(_)));
}

#[test]
fn closed_period_short_circuits_before_any_write() {
    let (store, orchestrator, org) = setup();
    store.seed_config(
        org,
        OrgConfig {
            accounts: test_accounts(),
            currencies: vec![aed()],
            closed_periods: HashSet::from([(2025, 3)]),
        },
    );
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    let err = orchestrator.post(org, movement_id).unwrap_err();
    assert!(matches!(
        err,
        PostingError::Guardrail(GuardrailViolation::FiscalPeriodClosed { .. })
    ));
    assert_eq!(store.journal_count(), 0);
    assert_eq!(store.link_count(), 0);
}

#[test]
fn unsupported_currency_is_rejected() {
    let (store, orchestrator, org) = setup();
    store.seed_config(
        org,
        OrgConfig {
            accounts: test_accounts(),
            currencies: vec![Currency::new("USD").unwrap()],
            closed_periods: HashSet::new(),
        },
    );
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    let err = orchestrator.post(org, movement_id).unwrap_err();
    assert!(matches!(
        err,
        PostingError::Guardrail(GuardrailViolation::UnsupportedCurrency { .. })
    ));
    assert_eq!(store.journal_count(), 0);
}

#[test]
fn zero_quantity_adjustment_skips_without_posting() {
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Adjustment, dec!(0), dec!(20));

    let outcome = orchestrator.post(org, movement_id).unwrap();
    match outcome {
        PostingOutcome::Skipped(SkipCause::NothingToPost { skipped }) => {
            assert_eq!(skipped.len(), 1);
        }
        other => panic!("expected NothingToPost skip, got {other:?}"),
    }
    assert_eq!(store.journal_count(), 0);
}

#[test]
fn journal_write_failure_persists_nothing_and_is_retryable() {
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    store.fail_next_journal_create();
    let err = orchestrator.post(org, movement_id).unwrap_err();
    assert!(matches!(err, PostingError::WriteFailure(_)));
    assert_eq!(store.journal_count(), 0);
    assert_eq!(store.link_count(), 0);

    // Nothing was persisted, so a plain retry succeeds.
    let outcome = orchestrator.post(org, movement_id).unwrap();
    assert!(outcome.created_journal_id().is_some());
    assert_eq!(store.journal_count(), 1);
}

#[test]
fn link_failure_orphans_the_journal_and_reconcile_repairs_it() {
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    store.fail_next_link_create();
    let err = orchestrator.post(org, movement_id).unwrap_err();
    let orphan_id = match err {
        PostingError::OrphanedWritten { journal_entry_id } => journal_entry_id,
        other => panic!("expected OrphanedWritten, got {other:?}"),
    };
    assert_eq!(store.journal_count(), 1);
    assert_eq!(store.link_count(), 0);

    // A blind retry must refuse to write a second journal.
    let retry = orchestrator.post(org, movement_id).unwrap_err();
    assert!(matches!(retry, PostingError::OrphanedWritten { .. }));
    assert_eq!(store.journal_count(), 1);

    // Reconcile attaches the missing link to the existing journal.
    let reconciled = orchestrator.reconcile(org, movement_id).unwrap();
    assert_eq!(
        reconciled,
        ReconcileOutcome::Relinked {
            journal_entry_id: orphan_id
        }
    );
    assert_eq!(store.link_count(), 1);

    // And posting is now the ordinary idempotent skip.
    let after = orchestrator.post(org, movement_id).unwrap();
    assert!(matches!(
        after,
        PostingOutcome::Skipped(SkipCause::AlreadyPosted { .. })
    ));
    assert_eq!(store.journal_count(), 1);
}

#[test]
fn reconcile_with_no_journal_is_a_noop() {
    let (_store, orchestrator, org) = setup();
    assert_eq!(
        orchestrator.reconcile(org, MovementId::new()).unwrap(),
        ReconcileOutcome::NothingToReconcile
    );
}

#[test]
fn losing_the_link_race_is_a_skip_not_a_failure() {
    let (store, orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    // Simulate a concurrent worker winning the uniqueness race on the link.
    store.duplicate_next_link_create();
    let outcome = orchestrator.post(org, movement_id).unwrap();
    assert_eq!(
        outcome,
        PostingOutcome::Skipped(SkipCause::ConcurrentlyPosted)
    );
}

#[test]
fn batch_isolates_failures_and_counts_new_postings_only() {
    // Scenario: batch of 3 where #2 is already posted.
    let (store, orchestrator, org) = setup();
    let first = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));
    let second = seed_movement(&store, org, MovementType::Issue, dec!(4), dec!(25));
    let third = seed_movement(&store, org, MovementType::Adjustment, dec!(-2), dec!(30));

    orchestrator.post(org, second).unwrap();

    let batch = BatchOrchestrator::new(PostingOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let report = batch.run(org, &[first, second, third]);

    assert_eq!(report.posted, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.results.len(), 3);

    assert!(report.results[0].success);
    assert!(report.results[0].finance_transaction_id.is_some());

    // Already posted: success, but no new finance transaction.
    assert!(report.results[1].success);
    assert!(report.results[1].finance_transaction_id.is_none());

    assert!(report.results[2].success);
    assert_eq!(store.journal_count(), 3);
}

#[test]
fn one_bad_movement_does_not_abort_the_batch() {
    let (store, orchestrator, org) = setup();
    let good = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));
    let missing = MovementId::new();
    let also_good = seed_movement(&store, org, MovementType::Issue, dec!(1), dec!(7));

    let batch = BatchOrchestrator::new(orchestrator);
    let report = batch.run(org, &[good, missing, also_good]);

    assert_eq!(report.posted, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.results[1].success);
    assert!(report.results[1].error.as_deref().unwrap().contains("not found"));
    assert_eq!(store.journal_count(), 2);
}

#[test]
fn parallel_batch_matches_sequential_semantics() {
    let (store, orchestrator, org) = setup();
    let ids: Vec<MovementId> = (0..12)
        .map(|i| {
            seed_movement(
                &store,
                org,
                MovementType::Receipt,
                Decimal::from(i + 1),
                dec!(3.50),
            )
        })
        .collect();

    let batch = BatchOrchestrator::new(orchestrator);
    let report = batch.run_parallel(org, &ids, NonZeroUsize::new(4).unwrap());

    assert_eq!(report.posted, 12);
    assert_eq!(report.failed, 0);
    // Results come back in input order even with workers racing.
    let reported: Vec<MovementId> = report.results.iter().map(|r| r.source_id).collect();
    assert_eq!(reported, ids);
    assert_eq!(store.journal_count(), 12);
    assert_eq!(store.link_count(), 12);
}

#[test]
fn concurrent_posts_of_the_same_id_link_exactly_once() {
    // Both workers target the same source id; the link uniqueness constraint
    // guarantees exactly one of them owns the posting. A loser that already
    // wrote its journal before losing the race leaves an unlinked copy
    // behind for reconciliation tooling; what must never exist is a second
    // link.
    let (store, _orchestrator, org) = setup();
    let movement_id = seed_movement(&store, org, MovementType::Receipt, dec!(10), dec!(5));

    let outcomes: Vec<Result<PostingOutcome, PostingError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                scope.spawn(move || {
                    PostingOrchestrator::new(store.clone(), store.clone(), store)
                        .post(org, movement_id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let posted = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(PostingOutcome::Posted { .. })))
        .count();
    assert_eq!(posted, 1, "exactly one worker should own the posting");
    // Losers either skipped (already/concurrently posted) or observed the
    // winner's not-yet-linked journal; none of them may link a second time.
    for outcome in &outcomes {
        assert!(matches!(
            outcome,
            Ok(_) | Err(PostingError::OrphanedWritten { .. })
        ));
    }
    assert_eq!(store.link_count(), 1);

    // One journal per losing writer at most, plus the winner's.
    let journal_count = store.journal_count();
    assert!((1..=outcomes.len()).contains(&journal_count));
}
