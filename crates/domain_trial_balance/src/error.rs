//! Trial balance build errors
//!
//! Every variant is fatal for the build that raised it: nothing is returned
//! and nothing is cached.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use core_kernel::{ExchangeRateType, MoneyError, PortError, TemporalError};
use domain_ledger::LedgerError;

/// Cross-total checks run after a balance has been assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyCheck {
    /// Debtor group total vs the postings of the group
    DebtorGroup,
    /// Creditor group total vs the postings of the group
    CreditorGroup,
    /// Group totals summed vs the debtor or creditor total
    GroupsVsTotal,
    /// Debits vs credits across the debtor and creditor totals
    DebitsEqualCredits,
    /// Currency totals of a ledger vs its consolidated total
    ConsolidatedByLedger,
    /// Currency totals vs the grand consolidated total
    ConsolidatedTotal,
    /// Standard account subtotal vs its subledger postings
    SubledgerGroup,
}

impl fmt::Display for ConsistencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyCheck::DebtorGroup => "debtor group",
            ConsistencyCheck::CreditorGroup => "creditor group",
            ConsistencyCheck::GroupsVsTotal => "groups vs total",
            ConsistencyCheck::DebitsEqualCredits => "debits equal credits",
            ConsistencyCheck::ConsolidatedByLedger => "consolidated by ledger",
            ConsistencyCheck::ConsolidatedTotal => "consolidated total",
            ConsistencyCheck::SubledgerGroup => "subledger group",
        };
        f.write_str(name)
    }
}

/// Errors raised while building a trial balance
#[derive(Debug, Error)]
pub enum TrialBalanceError {
    /// No rate registered for a currency that has to be valued
    #[error("Missing {rate_type} exchange rate for {currency} on {date}")]
    MissingExchangeRate {
        currency: String,
        date: NaiveDate,
        rate_type: ExchangeRateType,
    },

    /// The query combines report options no recipe supports
    #[error("Unhandled trial balance variant: {0}")]
    UnhandledVariant(String),

    /// A cross-total check failed outside the tolerance
    #[error("Consistency check '{check}' failed for {scope}: computed {computed}, expected {expected}")]
    ConsistencyValidation {
        check: ConsistencyCheck,
        scope: String,
        computed: Decimal,
        expected: Decimal,
    },

    /// The account range filter contains characters other than digits and separators
    #[error("Malformed account range '{0}': only digits, '-' and '.' are allowed")]
    MalformedAccountRange(String),

    /// The query is structurally invalid (bad period, inverted range)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Settings could not be loaded or are out of range
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Temporal(#[from] TemporalError),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl TrialBalanceError {
    pub fn unhandled(message: impl Into<String>) -> Self {
        TrialBalanceError::UnhandledVariant(message.into())
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        TrialBalanceError::InvalidQuery(message.into())
    }

    /// Returns true for errors caused by caller input rather than by the
    /// data or the engine
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TrialBalanceError::MalformedAccountRange(_) | TrialBalanceError::InvalidQuery(_)
        )
    }
}

impl From<config::ConfigError> for TrialBalanceError {
    fn from(error: config::ConfigError) -> Self {
        TrialBalanceError::Configuration(error.to_string())
    }
}
