//! `ledgerbridge-core` — shared domain primitives.
//!
//! Strongly-typed identifiers, the currency value type, and the base error
//! model. No IO and no posting logic live here.

pub mod currency;
pub mod error;
pub mod id;

pub use currency::Currency;
pub use error::{DomainError, DomainResult};
pub use id::{JournalEntryId, LocationId, MovementId, OrganizationId, ProductId};
