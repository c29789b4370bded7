//! GL Line Builder: the posting rule table.
//!
//! Maps each movement line into a balanced DR/CR pair via a closed rule table
//! over [`PostingVariant`]. Pure: same movement + account map in, same lines
//! out. The preview calculator reuses this function, so the table cannot
//! drift between preview and posting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerbridge_core::Currency;

use crate::accounts::{AccountRole, GLAccountMap};
use crate::journal::{JournalLine, Side};
use crate::movement::{MovementLine, MovementTransaction, MovementType, PostingVariant};

/// DR/CR roles for a posting variant.
///
/// | Variant          | DR                   | CR                   |
/// |------------------|----------------------|----------------------|
/// | Opening, Receipt | inventory_asset      | inventory_clearing   |
/// | Issue            | cogs                 | inventory_asset      |
/// | AdjustmentGain   | inventory_asset      | inventory_adjustment |
/// | AdjustmentLoss   | inventory_adjustment | inventory_asset      |
pub fn rule_for(variant: PostingVariant) -> (AccountRole, AccountRole) {
    match variant {
        PostingVariant::Opening | PostingVariant::Receipt => {
            (AccountRole::InventoryAsset, AccountRole::InventoryClearing)
        }
        PostingVariant::Issue => (AccountRole::Cogs, AccountRole::InventoryAsset),
        PostingVariant::AdjustmentGain => {
            (AccountRole::InventoryAsset, AccountRole::InventoryAdjustment)
        }
        PostingVariant::AdjustmentLoss => {
            (AccountRole::InventoryAdjustment, AccountRole::InventoryAsset)
        }
    }
}

/// Why a movement line produced no journal lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No posting rule for this (movement type, quantity sign) combination.
    Unclassifiable { movement_type: MovementType },
    /// A zero-amount DR/CR pair is ledger noise; nothing to post.
    ZeroAmount,
}

/// Record of a movement line that was skipped rather than posted.
///
/// Skips never block the rest of the movement, but they are surfaced in the
/// journal metadata so the gap is traceable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// Zero-based index of the line in the source movement.
    pub line_index: usize,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Builder output: the generated lines plus any skips.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltLines {
    pub lines: Vec<JournalLine>,
    pub skipped: Vec<SkippedLine>,
}

impl BuiltLines {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of debit amounts across all lines.
    pub fn total_dr(&self) -> Decimal {
        self.side_total(Side::Debit)
    }

    /// Sum of credit amounts across all lines.
    pub fn total_cr(&self) -> Decimal {
        self.side_total(Side::Credit)
    }

    fn side_total(&self, side: Side) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.side == side)
            .map(|l| l.amount)
            .sum()
    }
}

/// Build the journal lines for one movement transaction.
///
/// Output ordering is deterministic: for source line k the DR line precedes
/// the CR line, and lines for k precede lines for k+1. Line numbers are a
/// running 1-based counter over emitted lines.
pub fn build_gl_lines(movement: &MovementTransaction, accounts: &GLAccountMap) -> BuiltLines {
    let mut built = BuiltLines::default();
    let mut line_number: u32 = 0;

    for (idx, line) in movement.lines.iter().enumerate() {
        let Some(variant) = PostingVariant::classify(movement.movement_type, line.quantity) else {
            built.skipped.push(SkippedLine {
                line_index: idx,
                reason: SkipReason::Unclassifiable {
                    movement_type: movement.movement_type,
                },
            });
            continue;
        };

        let amount = line.amount.abs();
        if amount.is_zero() {
            built.skipped.push(SkippedLine {
                line_index: idx,
                reason: SkipReason::ZeroAmount,
            });
            continue;
        }

        let (dr_role, cr_role) = rule_for(variant);
        for (side, role) in [(Side::Debit, dr_role), (Side::Credit, cr_role)] {
            line_number += 1;
            built.lines.push(make_line(
                line_number,
                side,
                role,
                accounts,
                &movement.currency,
                amount,
                line,
            ));
        }
    }

    built
}

fn make_line(
    line_number: u32,
    side: Side,
    role: AccountRole,
    accounts: &GLAccountMap,
    currency: &Currency,
    amount: Decimal,
    source: &MovementLine,
) -> JournalLine {
    let account = accounts.account(role);
    JournalLine {
        line_number,
        side,
        role,
        account_code: account.code.clone(),
        account_name: account.name.clone(),
        currency: currency.clone(),
        amount,
        product_id: Some(source.product_id),
        location_id: Some(source.location_id),
        description: source.description.clone(),
    }
}
