//! Posting Orchestrator: the end-to-end state machine for one movement.
//!
//! `Start → Loaded → Validated → Built → Balanced → Written → Linked → Done`,
//! with `Skipped` and `Failed` terminals. The states are implicit in the
//! control flow; what is explicit is every gate's outcome and the one rule
//! that matters most: once the journal entry has been written, the write is
//! never retried. A failure between write and link surfaces as
//! [`PostingError::OrphanedWritten`] and is resolved by [`reconcile`],
//! which attaches the missing link instead of creating a duplicate journal.
//!
//! [`reconcile`]: PostingOrchestrator::reconcile

use thiserror::Error;
use tracing::{error, info, warn};

use ledgerbridge_core::{JournalEntryId, MovementId, OrganizationId};
use ledgerbridge_domain::{
    build_gl_lines, verify_balance, JournalEntry, JournalMetadata, JournalStatus, PostingLink,
    SkippedLine, UnbalancedLedger, FINANCE_DNA_VERSION, GL_JOURNAL, POSTING_TYPE_AUTO,
};

use crate::guardrails::{validate_currency, validate_fiscal_period, GuardrailViolation};
use crate::store::{ConfigStore, JournalStore, MovementStore, StoreError};

/// Terminal failure of a posting attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostingError {
    /// The source movement does not exist. Not retried.
    #[error("movement {0} not found")]
    NotFound(MovementId),

    /// A guardrail rejected the attempt. Resubmit once configuration changes.
    #[error("guardrail violation: {0}")]
    Guardrail(#[from] GuardrailViolation),

    /// The generated lines do not balance — a defect in the builder or the
    /// account map. Nothing was persisted; an operator must look at this.
    #[error(transparent)]
    Unbalanced(#[from] UnbalancedLedger),

    /// The journal write failed and nothing is assumed persisted. The whole
    /// attempt is safe to retry.
    #[error("journal write failed: {0}")]
    WriteFailure(StoreError),

    /// The journal was written but the posting link was not. Retrying the
    /// write would duplicate the journal; run `reconcile` for this source id
    /// instead.
    #[error("journal {journal_entry_id} written but not linked to its source")]
    OrphanedWritten { journal_entry_id: JournalEntryId },

    /// A read-side store failure before anything was written. Safe to retry.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why an attempt was skipped. Skips are successes: the idempotent outcome
/// for already-posted or non-postable movements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipCause {
    /// A posting link already exists for this source id.
    AlreadyPosted { journal_entry_id: JournalEntryId },
    /// A concurrent attempt linked this source id first; its journal stands.
    ConcurrentlyPosted,
    /// The builder produced zero lines (nothing postable in this movement).
    NothingToPost { skipped: Vec<SkippedLine> },
}

/// Successful terminal state of a posting attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingOutcome {
    Posted { journal_entry_id: JournalEntryId },
    Skipped(SkipCause),
}

impl PostingOutcome {
    /// The journal entry id created *by this attempt*, if any.
    pub fn created_journal_id(&self) -> Option<JournalEntryId> {
        match self {
            PostingOutcome::Posted { journal_entry_id } => Some(*journal_entry_id),
            PostingOutcome::Skipped(_) => None,
        }
    }
}

/// Result of a reconciliation pass for one source id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Found an unlinked journal and attached the missing link.
    Relinked { journal_entry_id: JournalEntryId },
    /// Link already present; nothing to do.
    AlreadyLinked { journal_entry_id: JournalEntryId },
    /// No journal exists for this source; a normal posting attempt is safe.
    NothingToReconcile,
}

/// Drives a single movement through validation, line building, balancing,
/// the journal write, and link creation.
pub struct PostingOrchestrator<M, J, C> {
    movements: M,
    journals: J,
    config: C,
}

impl<M, J, C> PostingOrchestrator<M, J, C>
where
    M: MovementStore,
    J: JournalStore,
    C: ConfigStore,
{
    pub fn new(movements: M, journals: J, config: C) -> Self {
        Self {
            movements,
            journals,
            config,
        }
    }

    /// Post one movement. Idempotent: a second call for the same source id
    /// returns `Skipped(AlreadyPosted)` without touching the ledger.
    pub fn post(
        &self,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<PostingOutcome, PostingError> {
        let span = tracing::info_span!(
            "post_movement",
            org = %organization_id,
            movement = %movement_id,
        );
        let _guard = span.enter();

        // Start → Loaded.
        let movement = self
            .movements
            .fetch_movement(organization_id, movement_id)?
            .ok_or(PostingError::NotFound(movement_id))?;

        // Idempotency gate: the posting link is the sole witness.
        if let Some(link) = self.journals.find_posting_link(movement_id)? {
            info!(journal = %link.journal_entry_id, "already posted, skipping");
            return Ok(PostingOutcome::Skipped(SkipCause::AlreadyPosted {
                journal_entry_id: link.journal_entry_id,
            }));
        }

        // Orphan gate: a journal without a link means a previous attempt died
        // between write and link. Writing again would duplicate the journal.
        if let Some(orphan) = self
            .journals
            .find_journal_by_source(organization_id, movement_id)?
        {
            error!(journal = %orphan.id, "unlinked journal found for source; reconcile required");
            return Err(PostingError::OrphanedWritten {
                journal_entry_id: orphan.id,
            });
        }

        // Loaded → Validated: fiscal period first, then currency.
        validate_fiscal_period(&self.config, organization_id, movement.transaction_date)??;
        validate_currency(&self.config, organization_id, &movement.currency)??;

        // Validated → Built.
        let accounts = self.config.account_map(organization_id)?;
        let built = build_gl_lines(&movement, &accounts);
        for skip in &built.skipped {
            warn!(line_index = skip.line_index, reason = ?skip.reason, "movement line skipped");
        }
        if built.is_empty() {
            info!("no postable lines, skipping");
            return Ok(PostingOutcome::Skipped(SkipCause::NothingToPost {
                skipped: built.skipped,
            }));
        }

        // Built → Balanced.
        if let Err(unbalanced) = verify_balance(&built.lines) {
            error!(%unbalanced, "builder produced unbalanced lines; refusing to post");
            return Err(PostingError::Unbalanced(unbalanced));
        }

        let total_dr = built.total_dr();
        let entry = JournalEntry {
            id: JournalEntryId::new(),
            entry_type: GL_JOURNAL.to_string(),
            date: movement.transaction_date,
            total_amount: total_dr,
            status: JournalStatus::Posted,
            metadata: JournalMetadata {
                finance_dna_version: FINANCE_DNA_VERSION.to_string(),
                source_transaction_id: movement.id,
                source_transaction_type: movement.movement_type.as_str().to_string(),
                source_transaction_number: movement.transaction_number.clone(),
                posting_type: POSTING_TYPE_AUTO.to_string(),
                total_dr,
                total_cr: built.total_cr(),
                currency: movement.currency.clone(),
                fiscal_period_validated: true,
                currency_validated: true,
                balance_validated: true,
                skipped_lines: built.skipped,
            },
            lines: built.lines,
        };

        // Balanced → Written. Nothing persisted on failure.
        let journal_entry_id = self
            .journals
            .create_journal(&entry)
            .map_err(PostingError::WriteFailure)?;

        // Written → Linked. From here on, the write is never repeated.
        let link = PostingLink {
            source_transaction_id: movement_id,
            journal_entry_id,
        };
        match self.journals.create_posting_link(&link) {
            Ok(()) => {
                info!(journal = %journal_entry_id, "movement posted");
                Ok(PostingOutcome::Posted { journal_entry_id })
            }
            Err(StoreError::DuplicateLink(_)) => {
                // Lost the race: another worker posted this source first.
                // Their journal is linked; ours is orphaned but harmless to
                // leave for reconciliation tooling (it carries the same
                // lineage metadata).
                warn!(journal = %journal_entry_id, "concurrent posting won the link race");
                Ok(PostingOutcome::Skipped(SkipCause::ConcurrentlyPosted))
            }
            Err(err) => {
                error!(journal = %journal_entry_id, %err, "link creation failed after write");
                Err(PostingError::OrphanedWritten { journal_entry_id })
            }
        }
    }

    /// Attach the missing posting link for a source whose previous attempt
    /// ended in [`PostingError::OrphanedWritten`].
    pub fn reconcile(
        &self,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<ReconcileOutcome, PostingError> {
        if let Some(link) = self.journals.find_posting_link(movement_id)? {
            return Ok(ReconcileOutcome::AlreadyLinked {
                journal_entry_id: link.journal_entry_id,
            });
        }

        let Some(journal) = self
            .journals
            .find_journal_by_source(organization_id, movement_id)?
        else {
            return Ok(ReconcileOutcome::NothingToReconcile);
        };

        let link = PostingLink {
            source_transaction_id: movement_id,
            journal_entry_id: journal.id,
        };
        match self.journals.create_posting_link(&link) {
            Ok(()) => {
                info!(journal = %journal.id, movement = %movement_id, "orphaned journal relinked");
                Ok(ReconcileOutcome::Relinked {
                    journal_entry_id: journal.id,
                })
            }
            // Someone linked it between our check and our write; also fine.
            Err(StoreError::DuplicateLink(_)) => Ok(ReconcileOutcome::AlreadyLinked {
                journal_entry_id: journal.id,
            }),
            Err(err) => Err(PostingError::Store(err)),
        }
    }
}
