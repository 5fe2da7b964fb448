//! Ledger arithmetic configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::money::DEFAULT_MINOR_UNITS;
use crate::domain::policy::LedgerPolicy;

/// Ledger currency precision and default operator cut.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Decimal places of the ledger currency.
    #[serde(default = "default_minor_units")]
    pub minor_units: u32,
    /// Company cut in percent for pools without an override.
    #[serde(default = "default_company_cut_percent")]
    pub default_company_cut_percent: Decimal,
}

fn default_minor_units() -> u32 {
    DEFAULT_MINOR_UNITS
}

fn default_company_cut_percent() -> Decimal {
    Decimal::TEN
}

impl LedgerConfig {
    #[must_use]
    pub fn policy(&self) -> LedgerPolicy {
        LedgerPolicy::new(self.minor_units, self.default_company_cut_percent)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            minor_units: default_minor_units(),
            default_company_cut_percent: default_company_cut_percent(),
        }
    }
}
