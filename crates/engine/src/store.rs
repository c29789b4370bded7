//! Store seams: the narrow read/write interfaces the engine needs.
//!
//! Everything stateful lives behind these traits. Implementations may be an
//! ERP database, an RPC client, or the in-memory store used in tests; the
//! engine makes no storage assumptions beyond the documented semantics.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use ledgerbridge_core::{Currency, JournalEntryId, MovementId, OrganizationId};
use ledgerbridge_domain::{GLAccountMap, JournalEntry, MovementTransaction, PostingLink};

/// Store operation error.
///
/// Infrastructure failures only; business rejections (guardrails, balance)
/// are modeled in the engine's own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The uniqueness constraint on `(source_transaction_id)` fired while
    /// creating a posting link: another writer already linked this source.
    /// The orchestrator maps this to a skip, never a failure.
    #[error("posting link already exists for source {0}")]
    DuplicateLink(MovementId),

    /// Transient or unexpected store failure (connection, constraint, ...).
    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Read access to the inventory subsystem's movement transactions.
pub trait MovementStore: Send + Sync {
    /// Fetch a movement with its lines. `Ok(None)` when it does not exist.
    fn fetch_movement(
        &self,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<Option<MovementTransaction>, StoreError>;
}

/// Write access to the finance subsystem, plus the reads the idempotency and
/// reconciliation paths need.
pub trait JournalStore: Send + Sync {
    /// Persist a journal entry (header + all lines) as one logical write.
    ///
    /// Implementations backed by separate header/line calls must make partial
    /// failure look like total failure: on `Err`, nothing is assumed persisted.
    fn create_journal(&self, entry: &JournalEntry) -> Result<JournalEntryId, StoreError>;

    /// Create the posting link for a source movement.
    ///
    /// Implementations must enforce uniqueness on `(source_transaction_id)`
    /// and report a violation as [`StoreError::DuplicateLink`]; that
    /// constraint is what closes the check-then-act race between concurrent
    /// posting attempts for the same source id.
    fn create_posting_link(&self, link: &PostingLink) -> Result<(), StoreError>;

    /// Look up the posting link for a source movement, if any.
    fn find_posting_link(
        &self,
        source_transaction_id: MovementId,
    ) -> Result<Option<PostingLink>, StoreError>;

    /// Find a journal entry by the `source_transaction_id` in its metadata.
    ///
    /// Used by reconciliation (and by the orchestrator before any write) to
    /// detect a journal whose link creation failed.
    fn find_journal_by_source(
        &self,
        organization_id: OrganizationId,
        source_transaction_id: MovementId,
    ) -> Result<Option<JournalEntry>, StoreError>;
}

/// Read access to per-organization finance configuration.
pub trait ConfigStore: Send + Sync {
    /// The four-role GL account map for this organization.
    fn account_map(&self, organization_id: OrganizationId) -> Result<GLAccountMap, StoreError>;

    /// Currencies the organization posts in.
    fn supported_currencies(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Currency>, StoreError>;

    /// Whether the fiscal period containing `date` is open for posting.
    fn is_period_open(
        &self,
        organization_id: OrganizationId,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn fetch_movement(
        &self,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<Option<MovementTransaction>, StoreError> {
        (**self).fetch_movement(organization_id, movement_id)
    }
}

impl<S> JournalStore for Arc<S>
where
    S: JournalStore + ?Sized,
{
    fn create_journal(&self, entry: &JournalEntry) -> Result<JournalEntryId, StoreError> {
        (**self).create_journal(entry)
    }

    fn create_posting_link(&self, link: &PostingLink) -> Result<(), StoreError> {
        (**self).create_posting_link(link)
    }

    fn find_posting_link(
        &self,
        source_transaction_id: MovementId,
    ) -> Result<Option<PostingLink>, StoreError> {
        (**self).find_posting_link(source_transaction_id)
    }

    fn find_journal_by_source(
        &self,
        organization_id: OrganizationId,
        source_transaction_id: MovementId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        (**self).find_journal_by_source(organization_id, source_transaction_id)
    }
}

impl<S> ConfigStore for Arc<S>
where
    S: ConfigStore + ?Sized,
{
    fn account_map(&self, organization_id: OrganizationId) -> Result<GLAccountMap, StoreError> {
        (**self).account_map(organization_id)
    }

    fn supported_currencies(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Currency>, StoreError> {
        (**self).supported_currencies(organization_id)
    }

    fn is_period_open(
        &self,
        organization_id: OrganizationId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        (**self).is_period_open(organization_id, date)
    }
}
