//! Ledger master data errors

use thiserror::Error;

/// Errors that can occur while building or walking master data
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Account number is empty or contains characters other than digits and separators
    #[error("Invalid account number: '{0}'")]
    InvalidAccountNumber(String),

    /// Account already exists in the chart
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Account would hang below a higher ancestor with its own parent missing
    #[error("Account {account} skips a level: parent {missing} is not in the chart")]
    MissingIntermediateAccount { account: String, missing: String },

    /// Account not found in the chart
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Sector code is empty or not numeric
    #[error("Invalid sector code: '{0}'")]
    InvalidSectorCode(String),

    /// Sector already exists in the catalog
    #[error("Sector already exists: {0}")]
    SectorAlreadyExists(String),

    /// Sector referenced by a posting or a parent link is not in the catalog
    #[error("Unknown sector: {0}")]
    UnknownSector(String),

    /// Validity window ends before it starts
    #[error("Invalid validity window: {0}")]
    InvalidValidity(String),
}
