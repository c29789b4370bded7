//! Preview Calculator: dry-run posting for UI display.
//!
//! Shares the builder's rule table by construction — a preview request is
//! turned into a synthetic one-line movement and run through the exact same
//! code path as real posting, minus persistence.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use ledgerbridge_core::{Currency, LocationId, MovementId, OrganizationId, ProductId};

use crate::accounts::GLAccountMap;
use crate::builder::build_gl_lines;
use crate::journal::JournalLine;
use crate::movement::{MovementLine, MovementTransaction, MovementType};

/// Dry-run posting result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub lines: Vec<JournalLine>,
    pub balanced: bool,
}

/// Compute the financial impact of a hypothetical single-line movement.
///
/// Never touches a store and never fails: an unclassifiable input (e.g. a
/// zero-quantity adjustment) simply yields an empty, trivially-balanced
/// preview.
pub fn preview(
    movement_type: MovementType,
    quantity: Decimal,
    unit_cost: Decimal,
    currency: Currency,
    accounts: &GLAccountMap,
) -> Preview {
    let synthetic = MovementTransaction {
        id: MovementId::new(),
        organization_id: OrganizationId::new(),
        movement_type,
        transaction_number: String::new(),
        transaction_date: NaiveDate::default(),
        currency,
        lines: vec![MovementLine {
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            quantity,
            unit_cost,
            amount: quantity * unit_cost,
            description: None,
        }],
    };

    let built = build_gl_lines(&synthetic, accounts);
    let balanced = crate::balance::verify_balance(&built.lines).is_ok();

    Preview {
        lines: built.lines,
        balanced,
    }
}
