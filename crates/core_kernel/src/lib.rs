//! Core Kernel - Foundational types for the trial balance engine
//!
//! This crate provides the building blocks shared by the ledger master data
//! and the balance engine:
//! - Typed integer identifiers for master data
//! - Currencies and exchange rates over `rust_decimal`
//! - Accounting periods, month keys and the working-day calendar
//! - The unified port error used by every adapter

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Currency, ExchangeRate, ExchangeRateType, MoneyError, within_tolerance};
pub use temporal::{Period, MonthKey, WorkingCalendar, TemporalError};
pub use identifiers::{
    AccountsChartId, LedgerId, CurrencyId, StandardAccountId, SubledgerAccountId,
};
pub use ports::{DomainPort, PortError};
