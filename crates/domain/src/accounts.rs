//! GL account roles and the per-organization account map.

use serde::{Deserialize, Serialize};

/// The four logical account roles the posting rule table knows about.
///
/// Closed set: every generated journal line references exactly one role, and
/// there is no role outside these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    InventoryAsset,
    InventoryClearing,
    Cogs,
    InventoryAdjustment,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::InventoryAsset => "inventory_asset",
            AccountRole::InventoryClearing => "inventory_clearing",
            AccountRole::Cogs => "cogs",
            AccountRole::InventoryAdjustment => "inventory_adjustment",
        }
    }
}

/// A concrete GL account as configured in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GLAccount {
    pub code: String, // e.g. "1300"
    pub name: String, // e.g. "Inventory Asset"
}

impl GLAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Organization-scoped mapping of account roles to concrete accounts.
///
/// Loaded from configuration and passed by parameter — the builder never
/// reads account codes from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GLAccountMap {
    pub inventory_asset: GLAccount,
    pub inventory_clearing: GLAccount,
    pub cogs: GLAccount,
    pub inventory_adjustment: GLAccount,
}

impl GLAccountMap {
    pub fn account(&self, role: AccountRole) -> &GLAccount {
        match role {
            AccountRole::InventoryAsset => &self.inventory_asset,
            AccountRole::InventoryClearing => &self.inventory_clearing,
            AccountRole::Cogs => &self.cogs,
            AccountRole::InventoryAdjustment => &self.inventory_adjustment,
        }
    }
}
