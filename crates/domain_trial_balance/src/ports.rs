//! Trial Balance Ports
//!
//! The engine reads postings and exchange rates through these traits. The
//! account and sector trees come from `domain_ledger`'s hierarchy ports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_trial_balance::ports::PostingRepository;
//!
//! let postings: Arc<dyn PostingRepository> = Arc::new(InMemoryPostingStore::new(chart));
//! let rows = postings.get_postings(&query)?;
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{
    AccountsChartId, CurrencyId, DomainPort, ExchangeRate, ExchangeRateType, LedgerId, PortError,
};
use domain_ledger::{AccountNumber, SectorCode};

use crate::entry::PostingEntry;
use crate::query::BalancesType;

/// Filters handed to the posting store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingQuery {
    pub accounts_chart_id: AccountsChartId,
    /// Empty means every ledger
    pub ledger_ids: Vec<LedgerId>,
    /// Empty means every sector
    pub sector_codes: Vec<SectorCode>,
    /// Empty means every currency
    pub currency_ids: Vec<CurrencyId>,
    pub from_account: Option<AccountNumber>,
    /// Inclusive; accounts below this number are inside the range too
    pub to_account: Option<AccountNumber>,
    pub subledger_account: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Post-aggregation predicate applied by the store
    pub balances_type: BalancesType,
    /// Break balances down by subledger account
    pub with_subledger_accounts: bool,
}

impl PostingQuery {
    /// Returns true if `number` falls inside the account range
    pub fn account_in_range(&self, number: &AccountNumber) -> bool {
        let after_from = self.from_account.as_ref().map_or(true, |from| number >= from);
        let before_to = self.to_account.as_ref().map_or(true, |to| {
            number <= to || to.is_ancestor_of(number)
        });
        after_from && before_to
    }

    pub fn includes_ledger(&self, ledger: LedgerId) -> bool {
        self.ledger_ids.is_empty() || self.ledger_ids.contains(&ledger)
    }

    pub fn includes_currency(&self, currency: CurrencyId) -> bool {
        self.currency_ids.is_empty() || self.currency_ids.contains(&currency)
    }

    pub fn includes_sector(&self, sector: &SectorCode) -> bool {
        self.sector_codes.is_empty() || self.sector_codes.contains(sector)
    }
}

/// Source of posting-level balances
pub trait PostingRepository: DomainPort {
    /// Aggregated balances for the query's period and filters
    ///
    /// # Errors
    ///
    /// Returns a `PortError` if the store cannot be read or rejects the filters
    fn get_postings(&self, query: &PostingQuery) -> Result<Vec<PostingEntry>, PortError>;
}

/// Source of published exchange rates
pub trait ExchangeRateSource: DomainPort {
    /// Every rate of `rate_type` published on `date`
    fn get_rates(
        &self,
        rate_type: ExchangeRateType,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRate>, PortError>;
}
