//! Posting engine: store seams, guardrails, the posting state machine, and
//! batch fan-out.
//!
//! This crate owns everything between "a movement id arrives" and "a balanced
//! journal entry plus its posting link exist in the store". The domain crate
//! supplies the pure pieces; this crate sequences them and talks to the store
//! through narrow traits.

pub mod batch;
pub mod guardrails;
pub mod orchestrator;
pub mod store;

pub use batch::{BatchItemResult, BatchOrchestrator, BatchReport};
pub use guardrails::{validate_currency, validate_fiscal_period, GuardrailViolation};
pub use orchestrator::{
    PostingError, PostingOrchestrator, PostingOutcome, ReconcileOutcome, SkipCause,
};
pub use store::{ConfigStore, JournalStore, MovementStore, StoreError};
