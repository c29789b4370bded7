//! Balance Verifier: per-currency debit/credit conservation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerbridge_core::Currency;

use crate::journal::{JournalLine, Side};

/// Maximum tolerated |Σ DR − Σ CR| per currency (one minor unit).
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Per-currency debit/credit totals and their difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDelta {
    pub currency: Currency,
    pub total_dr: Decimal,
    pub total_cr: Decimal,
    /// `total_dr - total_cr` (signed).
    pub delta: Decimal,
}

/// Fatal defect signal: the generated line set does not conserve value.
///
/// This indicates a bug in the builder or a broken account map. Nothing may
/// be persisted once this is raised, and it must reach an operator rather
/// than being retried blindly.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("unbalanced ledger output: {}", describe_deltas(per_currency_deltas))]
pub struct UnbalancedLedger {
    /// Only the currencies whose delta exceeded tolerance.
    pub per_currency_deltas: Vec<CurrencyDelta>,
}

fn describe_deltas(deltas: &[CurrencyDelta]) -> String {
    deltas
        .iter()
        .map(|d| format!("{} DR {} vs CR {}", d.currency, d.total_dr, d.total_cr))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Verify that the generated lines balance within tolerance, per currency.
///
/// An empty line set is trivially balanced (the orchestrator treats it as a
/// skip before it ever gets here).
pub fn verify_balance(lines: &[JournalLine]) -> Result<(), UnbalancedLedger> {
    // BTreeMap so failure output lists currencies deterministically.
    let mut totals: BTreeMap<Currency, (Decimal, Decimal)> = BTreeMap::new();

    for line in lines {
        let entry = totals
            .entry(line.currency.clone())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        match line.side {
            Side::Debit => entry.0 += line.amount,
            Side::Credit => entry.1 += line.amount,
        }
    }

    let violations: Vec<CurrencyDelta> = totals
        .into_iter()
        .filter_map(|(currency, (dr, cr))| {
            let delta = dr - cr;
            if delta.abs() > BALANCE_TOLERANCE {
                Some(CurrencyDelta {
                    currency,
                    total_dr: dr,
                    total_cr: cr,
                    delta,
                })
            } else {
                None
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(UnbalancedLedger {
            per_currency_deltas: violations,
        })
    }
}
