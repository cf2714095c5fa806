//! Ledger master data
//!
//! Everything the balance engine needs to know about the books besides the
//! postings themselves:
//! - segmented account numbers and the accounts chart
//! - sectors and their tree
//! - ledgers and the light references carried on entries
//!
//! The chart and the sector catalog double as in-memory implementations of
//! the `AccountHierarchy` and `SectorHierarchy` ports.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{AccountsChart, AccountHierarchy, AccountNumber};
//!
//! let number = AccountNumber::parse("1-01-02")?;
//! let parent = chart.parent(&number);
//! ```

pub mod account;
pub mod chart;
pub mod sector;
pub mod ledger;
pub mod error;

pub use account::{
    Account, AccountNumber, AccountRole, CurrencyRule, DebtorCreditor, SectorRule, Validity,
};
pub use chart::{AccountHierarchy, AccountsChart};
pub use sector::{Sector, SectorCatalog, SectorCode, SectorHierarchy};
pub use ledger::{CurrencyRef, Ledger, LedgerRef};
pub use error::LedgerError;
