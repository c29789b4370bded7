//! In-memory store implementing all three engine seams.
//!
//! Intended for tests/dev. Not optimized for performance. Enforces the same
//! semantics a production backend must provide, most importantly the
//! uniqueness constraint on posting-link source ids, and offers one-shot
//! failure injection so orchestrator failure paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{Datelike, NaiveDate};

use ledgerbridge_core::{Currency, JournalEntryId, MovementId, OrganizationId};
use ledgerbridge_domain::{GLAccountMap, JournalEntry, MovementTransaction, PostingLink};
use ledgerbridge_engine::{ConfigStore, JournalStore, MovementStore, StoreError};

/// Per-organization finance configuration.
#[derive(Debug, Clone)]
pub struct OrgConfig {
    pub accounts: GLAccountMap,
    pub currencies: Vec<Currency>,
    /// Closed fiscal periods as (year, month). Everything else is open.
    pub closed_periods: HashSet<(i32, u32)>,
}

#[derive(Debug, Default)]
struct Tables {
    movements: HashMap<(OrganizationId, MovementId), MovementTransaction>,
    journals: Vec<JournalEntry>,
    links: HashMap<MovementId, PostingLink>,
    configs: HashMap<OrganizationId, OrgConfig>,
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
    fail_next_journal_create: AtomicBool,
    fail_next_link_create: AtomicBool,
    duplicate_next_link_create: AtomicBool,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_config(&self, organization_id: OrganizationId, config: OrgConfig) {
        self.write().configs.insert(organization_id, config);
    }

    pub fn seed_movement(&self, movement: MovementTransaction) {
        self.write()
            .movements
            .insert((movement.organization_id, movement.id), movement);
    }

    /// Make the next `create_journal` call fail with a backend error.
    pub fn fail_next_journal_create(&self) {
        self.fail_next_journal_create.store(true, Ordering::SeqCst);
    }

    /// Make the next `create_posting_link` call fail with a backend error
    /// (simulates dying between write and link).
    pub fn fail_next_link_create(&self) {
        self.fail_next_link_create.store(true, Ordering::SeqCst);
    }

    /// Make the next `create_posting_link` call report a uniqueness
    /// violation, as if a concurrent worker linked the source id first.
    pub fn duplicate_next_link_create(&self) {
        self.duplicate_next_link_create.store(true, Ordering::SeqCst);
    }

    /// Snapshot of all persisted journal entries.
    pub fn journals(&self) -> Vec<JournalEntry> {
        self.read().journals.clone()
    }

    pub fn journal_count(&self) -> usize {
        self.read().journals.len()
    }

    pub fn link_count(&self) -> usize {
        self.read().links.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        // Lock poisoning only happens if a test panicked mid-write.
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn config_for(&self, organization_id: OrganizationId) -> Result<OrgConfig, StoreError> {
        self.read()
            .configs
            .get(&organization_id)
            .cloned()
            .ok_or_else(|| StoreError::backend(format!("no config for org {organization_id}")))
    }
}

impl MovementStore for InMemoryLedgerStore {
    fn fetch_movement(
        &self,
        organization_id: OrganizationId,
        movement_id: MovementId,
    ) -> Result<Option<MovementTransaction>, StoreError> {
        Ok(self
            .read()
            .movements
            .get(&(organization_id, movement_id))
            .cloned())
    }
}

impl JournalStore for InMemoryLedgerStore {
    fn create_journal(&self, entry: &JournalEntry) -> Result<JournalEntryId, StoreError> {
        if self.fail_next_journal_create.swap(false, Ordering::SeqCst) {
            return Err(StoreError::backend("injected journal-create failure"));
        }
        let mut tables = self.write();
        tables.journals.push(entry.clone());
        Ok(entry.id)
    }

    fn create_posting_link(&self, link: &PostingLink) -> Result<(), StoreError> {
        if self.fail_next_link_create.swap(false, Ordering::SeqCst) {
            return Err(StoreError::backend("injected link-create failure"));
        }
        if self.duplicate_next_link_create.swap(false, Ordering::SeqCst) {
            return Err(StoreError::DuplicateLink(link.source_transaction_id));
        }
        let mut tables = self.write();
        // Uniqueness on (source_transaction_id): check and insert under one
        // write lock, like a database unique index.
        if tables.links.contains_key(&link.source_transaction_id) {
            return Err(StoreError::DuplicateLink(link.source_transaction_id));
        }
        tables.links.insert(link.source_transaction_id, *link);
        Ok(())
    }

    fn find_posting_link(
        &self,
        source_transaction_id: MovementId,
    ) -> Result<Option<PostingLink>, StoreError> {
        Ok(self.read().links.get(&source_transaction_id).copied())
    }

    fn find_journal_by_source(
        &self,
        _organization_id: OrganizationId,
        source_transaction_id: MovementId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self
            .read()
            .journals
            .iter()
            .find(|j| j.metadata.source_transaction_id == source_transaction_id)
            .cloned())
    }
}

impl ConfigStore for InMemoryLedgerStore {
    fn account_map(&self, organization_id: OrganizationId) -> Result<GLAccountMap, StoreError> {
        Ok(self.config_for(organization_id)?.accounts)
    }

    fn supported_currencies(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Currency>, StoreError> {
        Ok(self.config_for(organization_id)?.currencies)
    }

    fn is_period_open(
        &self,
        organization_id: OrganizationId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let config = self.config_for(organization_id)?;
        Ok(!config.closed_periods.contains(&(date.year(), date.month())))
    }
}
