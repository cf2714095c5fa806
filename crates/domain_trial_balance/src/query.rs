//! Trial balance queries
//!
//! A query carries the retrieval filters plus the report-shaping options.
//! Its `Hash` is the cache fingerprint, so every field that changes the
//! result must take part in it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountsChartId, CurrencyId, ExchangeRateType, LedgerId, Period};
use domain_ledger::{AccountNumber, SectorCode};

use crate::error::TrialBalanceError;
use crate::ports::PostingQuery;

/// Report shape requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialBalanceType {
    Traditional,
    AnalyticByAccount,
    BySubledgerAccount,
    ByAccountWithLedgers,
    MultiCurrency,
    Comparative,
    Valued,
}

/// Which account balances the retrieval returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancesType {
    /// Every combination with at least one movement up to the end date
    #[default]
    AllAccounts,
    /// The above plus zero rows for every posting account of the chart
    AllAccountsInCatalog,
    WithCurrentBalance,
    WithCurrentBalanceOrMovements,
    WithMovements,
}

/// Valuation requested explicitly by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValuationOptions {
    pub target_currency: CurrencyId,
    pub exchange_rate_type: Option<ExchangeRateType>,
    pub exchange_rate_date: Option<NaiveDate>,
}

impl ValuationOptions {
    /// Valuation into `target_currency` with the rate picked from the period end
    pub fn to(target_currency: CurrencyId) -> Self {
        Self {
            target_currency,
            exchange_rate_type: None,
            exchange_rate_date: None,
        }
    }

    /// Valuation with an explicit rate type and date
    pub fn with_rate(mut self, rate_type: ExchangeRateType, date: NaiveDate) -> Self {
        self.exchange_rate_type = Some(rate_type);
        self.exchange_rate_date = Some(date);
        self
    }
}

/// Everything needed to build one trial balance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialBalanceQuery {
    pub accounts_chart_id: AccountsChartId,
    pub trial_balance_type: TrialBalanceType,
    pub balances_type: BalancesType,
    pub period: Period,
    pub ledger_ids: Vec<LedgerId>,
    pub sector_codes: Vec<SectorCode>,
    pub currency_ids: Vec<CurrencyId>,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub subledger_account: Option<String>,
    /// Merge ledgers into one
    pub consolidated: bool,
    pub show_cascade_balances: bool,
    pub with_sectorization: bool,
    pub with_subledger_accounts: bool,
    /// Deepest account level returned; 0 returns every level
    pub level: u32,
    pub valuation: Option<ValuationOptions>,
    pub use_default_valuation: bool,
    pub consolidate_to_target_currency: bool,
    pub comparison_period: Option<Period>,
}

impl TrialBalanceQuery {
    /// Creates a query with every option off
    ///
    /// # Errors
    ///
    /// Returns `Temporal` if `from` is after `to`
    pub fn new(
        accounts_chart_id: AccountsChartId,
        trial_balance_type: TrialBalanceType,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, TrialBalanceError> {
        Ok(Self {
            accounts_chart_id,
            trial_balance_type,
            balances_type: BalancesType::default(),
            period: Period::new(from, to)?,
            ledger_ids: Vec::new(),
            sector_codes: Vec::new(),
            currency_ids: Vec::new(),
            from_account: None,
            to_account: None,
            subledger_account: None,
            consolidated: false,
            show_cascade_balances: false,
            with_sectorization: false,
            with_subledger_accounts: false,
            level: 0,
            valuation: None,
            use_default_valuation: false,
            consolidate_to_target_currency: false,
            comparison_period: None,
        })
    }

    pub fn with_account_range(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.from_account = from.map(str::to_string);
        self.to_account = to.map(str::to_string);
        self
    }

    pub fn with_ledgers(mut self, ledger_ids: impl IntoIterator<Item = LedgerId>) -> Self {
        self.ledger_ids = ledger_ids.into_iter().collect();
        self
    }

    pub fn with_currencies(mut self, currency_ids: impl IntoIterator<Item = CurrencyId>) -> Self {
        self.currency_ids = currency_ids.into_iter().collect();
        self
    }

    pub fn with_sectors(mut self, sector_codes: impl IntoIterator<Item = SectorCode>) -> Self {
        self.sector_codes = sector_codes.into_iter().collect();
        self
    }

    pub fn with_balances_type(mut self, balances_type: BalancesType) -> Self {
        self.balances_type = balances_type;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_valuation(mut self, valuation: ValuationOptions) -> Self {
        self.valuation = Some(valuation);
        self
    }

    pub fn with_comparison(mut self, comparison: Period) -> Self {
        self.comparison_period = Some(comparison);
        self
    }

    /// Returns true when an account range narrows the balance
    pub fn has_account_range(&self) -> bool {
        self.from_account.is_some() || self.to_account.is_some()
    }

    /// Checks the caller-supplied filters and parses the account range
    ///
    /// # Errors
    ///
    /// - `MalformedAccountRange` if a bound holds anything but digits and separators
    /// - `InvalidQuery` if the range is inverted
    pub fn account_range(
        &self,
    ) -> Result<(Option<AccountNumber>, Option<AccountNumber>), TrialBalanceError> {
        let from = parse_range_bound(self.from_account.as_deref())?;
        let to = parse_range_bound(self.to_account.as_deref())?;
        if let (Some(from), Some(to)) = (&from, &to) {
            if from > to && !to.is_ancestor_of(from) {
                return Err(TrialBalanceError::invalid_query(format!(
                    "account range {from}..{to} is inverted"
                )));
            }
        }
        Ok((from, to))
    }

    /// Retrieval filters for `period`
    pub fn posting_query(
        &self,
        period: Period,
        with_subledger_accounts: bool,
    ) -> Result<PostingQuery, TrialBalanceError> {
        let (from_account, to_account) = self.account_range()?;
        Ok(PostingQuery {
            accounts_chart_id: self.accounts_chart_id,
            ledger_ids: self.ledger_ids.clone(),
            sector_codes: self.sector_codes.clone(),
            currency_ids: self.currency_ids.clone(),
            from_account,
            to_account,
            subledger_account: self.subledger_account.clone(),
            from_date: period.from,
            to_date: period.to,
            balances_type: self.balances_type,
            with_subledger_accounts,
        })
    }
}

fn parse_range_bound(bound: Option<&str>) -> Result<Option<AccountNumber>, TrialBalanceError> {
    let Some(raw) = bound.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let malformed = || TrialBalanceError::MalformedAccountRange(raw.to_string());
    if !raw.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '.') {
        return Err(malformed());
    }
    AccountNumber::parse(raw).map(Some).map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> TrialBalanceQuery {
        TrialBalanceQuery::new(
            AccountsChartId::new(1),
            TrialBalanceType::Traditional,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_letters_in_range() {
        let query = query().with_account_range(Some("1A-200"), None);
        assert!(matches!(
            query.account_range(),
            Err(TrialBalanceError::MalformedAccountRange(bound)) if bound == "1A-200"
        ));
    }

    #[test]
    fn test_rejects_dangling_separator() {
        let query = query().with_account_range(None, Some("1-"));
        assert!(matches!(
            query.account_range(),
            Err(TrialBalanceError::MalformedAccountRange(_))
        ));
    }

    #[test]
    fn test_blank_bounds_are_ignored() {
        let query = query().with_account_range(Some("  "), Some(""));
        assert_eq!(query.account_range().unwrap(), (None, None));
    }

    #[test]
    fn test_inverted_range() {
        let query = query().with_account_range(Some("2-01"), Some("1-01"));
        assert!(matches!(query.account_range(), Err(TrialBalanceError::InvalidQuery(_))));
    }

    #[test]
    fn test_range_ending_at_ancestor_is_not_inverted() {
        let query = query().with_account_range(Some("1-01-05"), Some("1-01"));
        assert!(query.account_range().is_ok());
    }

    #[test]
    fn test_sibling_sharing_a_prefix_is_inverted() {
        let query = query().with_account_range(Some("1-010"), Some("1-01"));
        assert!(matches!(query.account_range(), Err(TrialBalanceError::InvalidQuery(_))));
    }

    #[test]
    fn test_invalid_period() {
        let result = TrialBalanceQuery::new(
            AccountsChartId::new(1),
            TrialBalanceType::Traditional,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert!(matches!(result, Err(TrialBalanceError::Temporal(_))));
    }

    #[test]
    fn test_posting_query_carries_filters() {
        let query = query()
            .with_ledgers([LedgerId::new(2)])
            .with_account_range(Some("1"), Some("1-99"));
        let posting_query = query.posting_query(query.period, false).unwrap();
        assert_eq!(posting_query.ledger_ids, vec![LedgerId::new(2)]);
        assert_eq!(posting_query.from_account.unwrap().as_str(), "1");
        assert_eq!(posting_query.to_date, query.period.to);
    }
}
