//! Ledgers and the light references carried on balance entries

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Currency, CurrencyId, LedgerId};

/// A book of accounts kept for one business unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ledger {
    pub id: LedgerId,
    /// Ordering code used in reports, e.g. "01"
    pub number: String,
    pub name: String,
}

impl Ledger {
    pub fn new(id: LedgerId, number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
            name: name.into(),
        }
    }

    pub fn reference(&self) -> LedgerRef {
        LedgerRef::from(self)
    }
}

/// Ledger id plus its ordering number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    pub id: LedgerId,
    pub number: String,
}

impl From<&Ledger> for LedgerRef {
    fn from(ledger: &Ledger) -> Self {
        Self {
            id: ledger.id,
            number: ledger.number.clone(),
        }
    }
}

impl fmt::Display for LedgerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.number)
    }
}

/// Currency id plus its ordering code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyRef {
    pub id: CurrencyId,
    pub code: String,
}

impl CurrencyRef {
    pub fn new(id: CurrencyId, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
        }
    }
}

impl From<&Currency> for CurrencyRef {
    fn from(currency: &Currency) -> Self {
        Self {
            id: currency.id,
            code: currency.code.clone(),
        }
    }
}

impl fmt::Display for CurrencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
