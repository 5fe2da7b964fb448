//! Ledger-wide arithmetic policy.

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::DEFAULT_MINOR_UNITS;

/// Rounding precision and default operator cut shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerPolicy {
    /// Decimal places of the ledger currency.
    pub minor_units: u32,
    /// Company cut applied when a pool carries no override, in percent.
    pub default_company_cut_percent: Decimal,
}

impl LedgerPolicy {
    #[must_use]
    pub const fn new(minor_units: u32, default_company_cut_percent: Decimal) -> Self {
        Self {
            minor_units,
            default_company_cut_percent,
        }
    }
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MINOR_UNITS, Decimal::TEN)
    }
}
