//! Trial balance engine
//!
//! Builds trial balances (balanzas de comprobación) from posting-level
//! balances of a chart of accounts:
//! - account and sector rollups, group, debtor/creditor and currency totals
//! - consolidation across ledgers and into a target currency
//! - exchange rate valuation with automatic rate type selection
//! - consistency validation of every total against its detail
//! - a month-keyed cache of built balances
//!
//! Postings and exchange rates are read through the `PostingRepository` and
//! `ExchangeRateSource` ports; the account and sector trees through
//! `domain_ledger`'s hierarchy ports. In-memory adapters live in `adapters`.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_trial_balance::{TrialBalanceBuilder, TrialBalanceQuery, TrialBalanceType};
//!
//! let builder = TrialBalanceBuilder::new(postings, rates, chart, sectors, EngineSettings::default())
//!     .with_currencies(currencies);
//! let query = TrialBalanceQuery::new(chart_id, TrialBalanceType::Traditional, from, to)?;
//! let balance = builder.build(&query)?;
//! ```

pub mod adapters;
pub mod cache;
pub mod entry;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod query;
pub mod recipe;
pub mod restriction;
pub mod rollup;
pub mod settings;
pub mod validator;
pub mod valuation;

pub use cache::{CacheKey, TrialBalanceCache};
pub use entry::{
    BalanceAmounts, ItemType, PostingEntry, RollupTarget, SubledgerRef, SummaryKey,
    TrialBalanceEntry,
};
pub use error::{ConsistencyCheck, TrialBalanceError};
pub use pipeline::{TrialBalance, TrialBalanceBuilder};
pub use ports::{ExchangeRateSource, PostingQuery, PostingRepository};
pub use query::{BalancesType, TrialBalanceQuery, TrialBalanceType, ValuationOptions};
pub use recipe::{RecipeKind, ReportRecipe, TraditionalOptions, ValuationRequest};
pub use settings::{AverageBalanceBasis, EngineSettings};
pub use validator::ConsistencyValidator;
pub use valuation::{determine_rate_type_for_date, ValuationPlan, Valuator};
