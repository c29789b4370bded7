//! Posting domain: movement model, GL rule table, balance checking, preview.
//!
//! Pure domain logic only: no IO, no store access, no orchestration concerns.
//! Everything here is deterministic — the same movement and account map always
//! produce the same journal lines, which is what makes the posting engine
//! testable and the preview/builder parity guarantee possible.

pub mod accounts;
pub mod balance;
pub mod builder;
pub mod journal;
pub mod movement;
pub mod preview;

pub use accounts::{AccountRole, GLAccount, GLAccountMap};
pub use balance::{verify_balance, CurrencyDelta, UnbalancedLedger, BALANCE_TOLERANCE};
pub use builder::{build_gl_lines, rule_for, BuiltLines, SkipReason, SkippedLine};
pub use journal::{
    JournalEntry, JournalLine, JournalMetadata, JournalStatus, PostingLink, Side,
    FINANCE_DNA_VERSION, GL_JOURNAL, POSTED_TO_FINANCE, POSTING_TYPE_AUTO,
};
pub use movement::{MovementLine, MovementTransaction, MovementType, PostingVariant};
pub use preview::{preview, Preview};
