//! Batch Orchestrator: fan a list of movement ids out to the posting engine.
//!
//! Per-item failure isolation is the whole contract: one bad movement never
//! aborts its siblings, and every item's outcome is reported individually.

use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::warn;

use ledgerbridge_core::{JournalEntryId, MovementId, OrganizationId};

use crate::orchestrator::{PostingOrchestrator, PostingOutcome};
use crate::store::{ConfigStore, JournalStore, MovementStore};

/// Outcome of one movement in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemResult {
    pub source_id: MovementId,
    pub success: bool,
    /// Set only when this batch run created the journal entry. An
    /// already-posted movement is a success with no new finance id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_transaction_id: Option<JournalEntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary: `posted` counts newly created journals, `failed` counts
/// errored items; skips count toward neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub posted: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    fn from_results(results: Vec<BatchItemResult>) -> Self {
        let posted = results
            .iter()
            .filter(|r| r.finance_transaction_id.is_some())
            .count();
        let failed = results.iter().filter(|r| !r.success).count();
        Self {
            posted,
            failed,
            results,
        }
    }
}

/// Runs the posting orchestrator across many movements.
pub struct BatchOrchestrator<M, J, C> {
    posting: PostingOrchestrator<M, J, C>,
}

impl<M, J, C> BatchOrchestrator<M, J, C>
where
    M: MovementStore,
    J: JournalStore,
    C: ConfigStore,
{
    pub fn new(posting: PostingOrchestrator<M, J, C>) -> Self {
        Self { posting }
    }

    pub fn posting(&self) -> &PostingOrchestrator<M, J, C> {
        &self.posting
    }

    /// Post each movement in order, one at a time.
    pub fn run(&self, organization_id: OrganizationId, source_ids: &[MovementId]) -> BatchReport {
        BatchReport::from_results(
            source_ids
                .iter()
                .map(|id| self.post_one(organization_id, *id))
                .collect(),
        )
    }

    /// Post the batch on a bounded pool of scoped worker threads.
    ///
    /// There is no cross-item ordering requirement; distinct source ids are
    /// independent, and same-id races are closed by the store's link
    /// uniqueness constraint. Results come back in input order regardless of
    /// completion order.
    pub fn run_parallel(
        &self,
        organization_id: OrganizationId,
        source_ids: &[MovementId],
        workers: NonZeroUsize,
    ) -> BatchReport {
        if workers.get() == 1 || source_ids.len() <= 1 {
            return self.run(organization_id, source_ids);
        }

        let chunk_size = source_ids.len().div_ceil(workers.get());
        let mut results = Vec::with_capacity(source_ids.len());

        std::thread::scope(|scope| {
            let handles: Vec<_> = source_ids
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|id| self.post_one(organization_id, *id))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in handles {
                results.extend(handle.join().expect("batch worker thread panicked"));
            }
        });

        BatchReport::from_results(results)
    }

    fn post_one(&self, organization_id: OrganizationId, source_id: MovementId) -> BatchItemResult {
        match self.posting.post(organization_id, source_id) {
            Ok(PostingOutcome::Posted { journal_entry_id }) => BatchItemResult {
                source_id,
                success: true,
                finance_transaction_id: Some(journal_entry_id),
                error: None,
            },
            Ok(PostingOutcome::Skipped(_)) => BatchItemResult {
                source_id,
                success: true,
                finance_transaction_id: None,
                error: None,
            },
            Err(err) => {
                warn!(movement = %source_id, %err, "batch item failed");
                BatchItemResult {
                    source_id,
                    success: false,
                    finance_transaction_id: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
