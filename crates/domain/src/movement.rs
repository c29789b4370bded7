//! Inventory movement model and posting-variant classification.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerbridge_core::{Currency, LocationId, MovementId, OrganizationId, ProductId};

/// Movement classification as recorded by the inventory subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Opening,
    Receipt,
    Issue,
    Adjustment,
}

/// Closed posting variant, resolved once from (movement type, sign of quantity).
///
/// The builder dispatches on this instead of raw movement-type strings, so the
/// rule table is a total function: every variant maps to exactly one DR/CR
/// account pair, and anything unclassifiable is rejected here, at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingVariant {
    Opening,
    Receipt,
    Issue,
    AdjustmentGain,
    AdjustmentLoss,
}

impl PostingVariant {
    /// Classify a movement line.
    ///
    /// Returns `None` for combinations with no posting rule (a zero-quantity
    /// adjustment moves nothing in either direction).
    pub fn classify(movement_type: MovementType, quantity: Decimal) -> Option<Self> {
        match movement_type {
            MovementType::Opening => Some(Self::Opening),
            MovementType::Receipt => Some(Self::Receipt),
            MovementType::Issue => Some(Self::Issue),
            MovementType::Adjustment => {
                if quantity > Decimal::ZERO {
                    Some(Self::AdjustmentGain)
                } else if quantity < Decimal::ZERO {
                    Some(Self::AdjustmentLoss)
                } else {
                    None
                }
            }
        }
    }
}

/// One line of a movement transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub product_id: ProductId,
    pub location_id: LocationId,
    /// Signed quantity (negative = stock leaving, for adjustments).
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    /// Line value; the builder posts `abs(amount)` on both sides.
    pub amount: Decimal,
    pub description: Option<String>,
}

/// An inventory movement as loaded from the inventory subsystem.
///
/// Created externally and never mutated by the posting engine; corrections
/// arrive as new adjustment movements, not edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTransaction {
    pub id: MovementId,
    pub organization_id: OrganizationId,
    pub movement_type: MovementType,
    /// Human-facing document number ("GRN-00042"), carried into lineage metadata.
    pub transaction_number: String,
    pub transaction_date: NaiveDate,
    pub currency: Currency,
    pub lines: Vec<MovementLine>,
}

impl MovementType {
    /// Stable tag used in lineage metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Opening => "opening",
            MovementType::Receipt => "receipt",
            MovementType::Issue => "issue",
            MovementType::Adjustment => "adjustment",
        }
    }
}
