//! Guardrail Validator: pre-posting gate checks.
//!
//! Guardrails are gate conditions, not recoverable-in-place errors: a
//! rejection aborts the attempt before any GL line is computed. They become
//! passable again only when the organization's configuration changes (a
//! period is reopened, a currency is enabled), at which point the caller may
//! resubmit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgerbridge_core::{Currency, OrganizationId};

use crate::store::{ConfigStore, StoreError};

/// A guardrail rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum GuardrailViolation {
    #[error("fiscal period containing {date} is closed")]
    FiscalPeriodClosed { date: NaiveDate },

    #[error("currency {currency} is not supported by this organization")]
    UnsupportedCurrency { currency: Currency },
}

/// Check that the fiscal period containing `date` is open.
pub fn validate_fiscal_period<C: ConfigStore>(
    config: &C,
    organization_id: OrganizationId,
    date: NaiveDate,
) -> Result<Result<(), GuardrailViolation>, StoreError> {
    if config.is_period_open(organization_id, date)? {
        Ok(Ok(()))
    } else {
        Ok(Err(GuardrailViolation::FiscalPeriodClosed { date }))
    }
}

/// Check that the organization supports `currency`.
pub fn validate_currency<C: ConfigStore>(
    config: &C,
    organization_id: OrganizationId,
    currency: &Currency,
) -> Result<Result<(), GuardrailViolation>, StoreError> {
    if config.supported_currencies(organization_id)?.contains(currency) {
        Ok(Ok(()))
    } else {
        Ok(Err(GuardrailViolation::UnsupportedCurrency {
            currency: currency.clone(),
        }))
    }
}
