//! Journal entry model and lineage metadata.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerbridge_core::{Currency, JournalEntryId, LocationId, MovementId, ProductId};

use crate::accounts::AccountRole;
use crate::builder::SkippedLine;

/// Type tag carried on every journal entry created by this engine.
pub const GL_JOURNAL: &str = "GL_JOURNAL";

/// Posting type recorded in metadata: entries are machine-generated.
pub const POSTING_TYPE_AUTO: &str = "AUTO";

/// Version of the posting-rule DNA that produced an entry. Bump when the rule
/// table changes so reporting can tell generations apart.
pub const FINANCE_DNA_VERSION: &str = "v1";

/// Relationship type linking a source movement to its journal entry.
pub const POSTED_TO_FINANCE: &str = "POSTED_TO_FINANCE";

/// Debit or credit side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "DR")]
    Debit,
    #[serde(rename = "CR")]
    Credit,
}

/// One side of a double-entry posting (immutable once created).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Deterministic position within the entry (1-based). For source line k,
    /// the DR line precedes the CR line, and k's lines precede k+1's.
    pub line_number: u32,
    pub side: Side,
    pub role: AccountRole,
    pub account_code: String,
    pub account_name: String,
    pub currency: Currency,
    /// Always positive; the side carries the direction.
    pub amount: Decimal,
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Posted,
}

/// Lineage + validation metadata embedded in every created journal entry.
///
/// The serialized key names are a stable contract consumed by audit and
/// reporting tooling; do not rename them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalMetadata {
    pub finance_dna_version: String,
    pub source_transaction_id: MovementId,
    pub source_transaction_type: String,
    pub source_transaction_number: String,
    pub posting_type: String,
    pub total_dr: Decimal,
    pub total_cr: Decimal,
    pub currency: Currency,
    pub fiscal_period_validated: bool,
    pub currency_validated: bool,
    pub balance_validated: bool,
    /// Movement lines the builder skipped (unclassifiable or zero-amount).
    /// Kept here so a silent financial gap is at least traceable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_lines: Vec<SkippedLine>,
}

/// A balanced general-ledger journal entry. Append-only once created:
/// corrections are new adjustment movements, never edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub entry_type: String,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub status: JournalStatus,
    pub metadata: JournalMetadata,
    pub lines: Vec<JournalLine>,
}

/// Durable relationship `{source movement → journal entry}`.
///
/// Its existence is the sole idempotency witness: a movement with a posting
/// link is posted, full stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLink {
    pub source_transaction_id: MovementId,
    pub journal_entry_id: JournalEntryId,
}

impl PostingLink {
    /// Relationship type as stored ("POSTED_TO_FINANCE").
    pub fn relationship_type(&self) -> &'static str {
        POSTED_TO_FINANCE
    }
}
