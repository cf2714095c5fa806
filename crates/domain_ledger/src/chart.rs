//! The accounts chart and hierarchy lookups
//!
//! Parent lookup works by truncation: the parent of `1-02-01` is whatever the
//! chart holds under `1-02`. A truncated number missing from the chart ends
//! the walk, so the account acts as a root of its own subtree. A chart never
//! holds a subtree that skips a level: with `1` and `1-02-01` present, `1-02`
//! must be present too.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use core_kernel::{AccountsChartId, DomainPort};

use crate::account::{Account, AccountNumber};
use crate::error::LedgerError;

/// Read access to the account tree
pub trait AccountHierarchy: DomainPort {
    /// Looks up an account by number
    fn account(&self, number: &AccountNumber) -> Option<&Account>;

    /// Parent account of `number`, `None` at the top of the tree
    fn parent(&self, number: &AccountNumber) -> Option<&Account>;

    /// Direct children of `number`
    fn children(&self, number: &AccountNumber) -> Vec<&Account>;
}

/// A chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsChart {
    pub id: AccountsChartId,
    pub name: String,
    accounts: BTreeMap<AccountNumber, Account>,
}

impl AccountsChart {
    pub fn new(id: AccountsChartId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            accounts: BTreeMap::new(),
        }
    }

    /// Registers an account
    ///
    /// # Errors
    ///
    /// - `AccountAlreadyExists` if the number is already in the chart
    /// - `MissingIntermediateAccount` if the account, or one already below it,
    ///   would reach a higher ancestor while skipping its own parent
    pub fn add_account(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.number) {
            return Err(LedgerError::AccountAlreadyExists(account.number.to_string()));
        }
        let added = &account.number;
        let below = self.accounts.keys().filter(|number| added.is_ancestor_of(number));
        for number in std::iter::once(added).chain(below) {
            if let Some(missing) = self.skipped_parent(number, added) {
                return Err(LedgerError::MissingIntermediateAccount {
                    account: number.to_string(),
                    missing: missing.to_string(),
                });
            }
        }
        debug!(chart = %self.id, number = %account.number, "account added");
        self.accounts.insert(account.number.clone(), account);
        Ok(())
    }

    /// Looks up an account, failing when it is missing
    pub fn require(&self, number: &AccountNumber) -> Result<&Account, LedgerError> {
        self.accounts
            .get(number)
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))
    }

    /// Accounts whose number lies within `from..=to`, either bound optional
    pub fn accounts_in_range<'a>(
        &'a self,
        from: Option<&'a AccountNumber>,
        to: Option<&'a AccountNumber>,
    ) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts.values().filter(move |account| {
            from.map_or(true, |from| account.number >= *from)
                && to.map_or(true, |to| account.number <= *to)
        })
    }

    /// Accounts that take postings and are in force on `date`
    pub fn posting_accounts(&self, date: NaiveDate) -> impl Iterator<Item = &Account> + '_ {
        self.accounts
            .values()
            .filter(move |account| account.role.accepts_postings() && account.applies_on(date))
    }

    /// Ancestors of `number`, nearest first
    pub fn ancestors(&self, number: &AccountNumber) -> Vec<&Account> {
        let mut chain = Vec::new();
        let mut current = number.clone();
        while let Some(parent) = self.parent(&current) {
            chain.push(parent);
            current = parent.number.clone();
        }
        chain
    }

    /// Immediate parent of `number` when it is absent but a higher
    /// truncation is present, counting `added` as present
    fn skipped_parent(&self, number: &AccountNumber, added: &AccountNumber) -> Option<AccountNumber> {
        let present = |n: &AccountNumber| n == added || self.accounts.contains_key(n);
        let parent = number.parent_number()?;
        if present(&parent) {
            return None;
        }
        let mut higher = parent.parent_number();
        while let Some(candidate) = higher {
            if present(&candidate) {
                return Some(parent);
            }
            higher = candidate.parent_number();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl DomainPort for AccountsChart {}

impl AccountHierarchy for AccountsChart {
    fn account(&self, number: &AccountNumber) -> Option<&Account> {
        self.accounts.get(number)
    }

    fn parent(&self, number: &AccountNumber) -> Option<&Account> {
        number
            .parent_number()
            .and_then(|parent| self.accounts.get(&parent))
    }

    fn children(&self, number: &AccountNumber) -> Vec<&Account> {
        self.accounts
            .values()
            .filter(|account| account.number.parent_number().as_ref() == Some(number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountRole, DebtorCreditor};
    use core_kernel::StandardAccountId;

    fn number(value: &str) -> AccountNumber {
        AccountNumber::parse(value).unwrap()
    }

    fn account(id: i64, value: &str, role: AccountRole) -> Account {
        Account::new(
            StandardAccountId::new(id),
            number(value),
            format!("Cuenta {value}"),
            role,
            DebtorCreditor::Debtor,
        )
    }

    fn chart() -> AccountsChart {
        let mut chart = AccountsChart::new(AccountsChartId::new(1), "Catálogo");
        chart.add_account(account(1, "1", AccountRole::Summary)).unwrap();
        chart.add_account(account(2, "1-01", AccountRole::Summary)).unwrap();
        chart.add_account(account(3, "1-01-01", AccountRole::Posting)).unwrap();
        chart.add_account(account(4, "1-01-02", AccountRole::Posting)).unwrap();
        chart.add_account(account(5, "1-02", AccountRole::Posting)).unwrap();
        chart
    }

    #[test]
    fn test_parent_by_truncation() {
        let chart = chart();
        let parent = chart.parent(&number("1-01-02")).unwrap();
        assert_eq!(parent.number, number("1-01"));
        assert!(chart.parent(&number("1")).is_none());
    }

    #[test]
    fn test_missing_truncation_is_a_root() {
        let mut chart = AccountsChart::new(AccountsChartId::new(2), "Parcial");
        chart.add_account(account(1, "1-01", AccountRole::Summary)).unwrap();
        chart.add_account(account(2, "1-01-01", AccountRole::Posting)).unwrap();
        assert!(chart.parent(&number("1-01")).is_none());
        assert_eq!(chart.ancestors(&number("1-01-01")).len(), 1);
    }

    #[test]
    fn test_children() {
        let chart = chart();
        let children: Vec<_> = chart
            .children(&number("1-01"))
            .into_iter()
            .map(|a| a.number.to_string())
            .collect();
        assert_eq!(children, vec!["1-01-01", "1-01-02"]);
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut chart = chart();
        let result = chart.add_account(account(9, "1-02", AccountRole::Posting));
        assert_eq!(result, Err(LedgerError::AccountAlreadyExists("1-02".to_string())));
    }

    #[test]
    fn test_accounts_in_range() {
        let chart = chart();
        let from = number("1-01-01");
        let to = number("1-01-99");
        let found: Vec<_> = chart
            .accounts_in_range(Some(&from), Some(&to))
            .map(|a| a.number.to_string())
            .collect();
        assert_eq!(found, vec!["1-01-01", "1-01-02"]);
    }

    #[test]
    fn test_posting_accounts_skip_summaries() {
        let chart = chart();
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(chart.posting_accounts(date).count(), 3);
    }
}
