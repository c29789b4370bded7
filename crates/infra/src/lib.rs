//! Infrastructure: store implementations for the posting engine.
//!
//! Currently one backend: an in-memory store for tests and development.
//! Production deployments implement the engine's store traits against the
//! real ERP database/RPC layer instead.

pub mod in_memory;

#[cfg(test)]
mod integration_tests;

pub use in_memory::{InMemoryLedgerStore, OrgConfig};
