//! Accounts of the standard chart
//!
//! Account numbers are segmented (`1-02-01` or `1.02.01`). The number alone
//! determines the account's position in the hierarchy: its level is the
//! segment count and its parent is the number with the last segment removed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CurrencyId, StandardAccountId};

use crate::error::LedgerError;
use crate::sector::SectorCode;

const SEPARATORS: [char; 2] = ['-', '.'];

/// A segmented standard account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Parses an account number
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountNumber` if the value is empty, contains anything
    /// other than digits and `-`/`.` separators, or has an empty segment.
    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        let value = value.trim();
        let invalid = || LedgerError::InvalidAccountNumber(value.to_string());

        if value.is_empty() {
            return Err(invalid());
        }
        for segment in value.split(SEPARATORS) {
            if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the number's segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATORS)
    }

    /// Hierarchy level: one per segment
    pub fn level(&self) -> u32 {
        self.segments().count() as u32
    }

    /// Number of the parent account, `None` for level 1 numbers
    pub fn parent_number(&self) -> Option<AccountNumber> {
        self.0
            .rfind(SEPARATORS)
            .map(|idx| AccountNumber(self.0[..idx].to_string()))
    }

    /// Group the account belongs to: its first two digits followed by "00"
    pub fn group_number(&self) -> String {
        let prefix: String = self.0.chars().filter(|c| c.is_ascii_digit()).take(2).collect();
        format!("{prefix}00")
    }

    /// Returns true if `other` lies strictly below this number
    pub fn is_ancestor_of(&self, other: &AccountNumber) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0[self.0.len()..].starts_with(SEPARATORS)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> String {
        number.0
    }
}

/// How an account participates in the books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRole {
    /// Aggregates children; never receives postings
    Summary,
    /// Receives postings directly
    Posting,
    /// Receives postings through subledger accounts
    Control,
    /// Receives postings broken down by sector
    Sectorized,
}

impl AccountRole {
    /// Returns true if postings can be registered against the account
    pub fn accepts_postings(&self) -> bool {
        !matches!(self, AccountRole::Summary)
    }
}

/// Accounting polarity of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DebtorCreditor {
    Debtor,
    Creditor,
}

impl DebtorCreditor {
    /// Sign applied when debtor and creditor amounts are netted together
    pub fn sign(&self) -> Decimal {
        match self {
            DebtorCreditor::Debtor => Decimal::ONE,
            DebtorCreditor::Creditor => Decimal::NEGATIVE_ONE,
        }
    }

    /// Current balance produced by the movements of a period
    pub fn current_balance(&self, initial: Decimal, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            DebtorCreditor::Debtor => initial + debit - credit,
            DebtorCreditor::Creditor => initial + credit - debit,
        }
    }
}

impl fmt::Display for DebtorCreditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebtorCreditor::Debtor => f.write_str("debtor"),
            DebtorCreditor::Creditor => f.write_str("creditor"),
        }
    }
}

/// Time window in which a rule or an account is in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl Validity {
    /// A window open on both ends
    pub fn always() -> Self {
        Self {
            from: NaiveDate::MIN,
            to: None,
        }
    }

    /// A window starting on `from`, optionally ending on `to` (inclusive)
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self, LedgerError> {
        if let Some(to) = to {
            if to < from {
                return Err(LedgerError::InvalidValidity(format!("{from} > {to}")));
            }
        }
        Ok(Self { from, to })
    }

    /// Returns true if the window covers `date`
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        date >= self.from && self.to.map_or(true, |to| date <= to)
    }
}

impl Default for Validity {
    fn default() -> Self {
        Self::always()
    }
}

/// A currency the account may carry balances in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRule {
    pub currency: CurrencyId,
    pub validity: Validity,
}

impl CurrencyRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.validity.applies_on(date)
    }
}

/// A sector the account must be broken down by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRule {
    pub sector: SectorCode,
    pub validity: Validity,
}

impl SectorRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.validity.applies_on(date)
    }
}

/// An account in the standard chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: StandardAccountId,
    pub number: AccountNumber,
    pub name: String,
    pub role: AccountRole,
    pub debtor_creditor: DebtorCreditor,
    pub validity: Validity,
    pub currency_rules: Vec<CurrencyRule>,
    pub sector_rules: Vec<SectorRule>,
}

impl Account {
    /// Creates an account valid at all dates, without currency or sector rules
    pub fn new(
        id: StandardAccountId,
        number: AccountNumber,
        name: impl Into<String>,
        role: AccountRole,
        debtor_creditor: DebtorCreditor,
    ) -> Self {
        Self {
            id,
            number,
            name: name.into(),
            role,
            debtor_creditor,
            validity: Validity::always(),
            currency_rules: Vec::new(),
            sector_rules: Vec::new(),
        }
    }

    /// Restricts the account to a validity window
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    /// Adds a currency rule
    pub fn with_currency(mut self, currency: CurrencyId, validity: Validity) -> Self {
        self.currency_rules.push(CurrencyRule { currency, validity });
        self
    }

    /// Adds a sector rule
    pub fn with_sector(mut self, sector: SectorCode, validity: Validity) -> Self {
        self.sector_rules.push(SectorRule { sector, validity });
        self
    }

    pub fn level(&self) -> u32 {
        self.number.level()
    }

    pub fn group_number(&self) -> String {
        self.number.group_number()
    }

    /// Returns true if the account is in force on `date`
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.validity.applies_on(date)
    }

    /// Returns true if balances of this account are split by sector on `date`
    pub fn requires_sectorization(&self, date: NaiveDate) -> bool {
        self.role == AccountRole::Sectorized
            || self.sector_rules.iter().any(|rule| rule.applies_on(date))
    }

    /// Currencies the account may hold on `date`
    pub fn currencies_on(&self, date: NaiveDate) -> impl Iterator<Item = CurrencyId> + '_ {
        self.currency_rules
            .iter()
            .filter(move |rule| rule.applies_on(date))
            .map(|rule| rule.currency)
    }

    /// Sectors the account is broken down by on `date`
    pub fn sectors_on(&self, date: NaiveDate) -> impl Iterator<Item = &SectorCode> + '_ {
        self.sector_rules
            .iter()
            .filter(move |rule| rule.applies_on(date))
            .map(|rule| &rule.sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn number(value: &str) -> AccountNumber {
        AccountNumber::parse(value).unwrap()
    }

    #[test]
    fn test_level_and_parent() {
        let n = number("1-02-01");
        assert_eq!(n.level(), 3);
        assert_eq!(n.parent_number(), Some(number("1-02")));
        assert_eq!(number("1").parent_number(), None);
    }

    #[test]
    fn test_dot_separated_numbers() {
        let n = number("1101.05.03");
        assert_eq!(n.level(), 3);
        assert_eq!(n.parent_number(), Some(number("1101.05")));
    }

    #[test]
    fn test_group_number() {
        assert_eq!(number("1-02-01").group_number(), "1000");
        assert_eq!(number("1101-01").group_number(), "1100");
        assert_eq!(number("2").group_number(), "200");
    }

    #[test]
    fn test_rejects_letters_and_empty_segments() {
        assert!(AccountNumber::parse("1A-200").is_err());
        assert!(AccountNumber::parse("1--2").is_err());
        assert!(AccountNumber::parse("").is_err());
        assert!(AccountNumber::parse("1-").is_err());
    }

    #[test]
    fn test_is_ancestor_of() {
        assert!(number("1-02").is_ancestor_of(&number("1-02-01")));
        assert!(!number("1-02").is_ancestor_of(&number("1-020")));
        assert!(!number("1-02").is_ancestor_of(&number("1-02")));
    }

    #[test]
    fn test_current_balance_by_nature() {
        assert_eq!(
            DebtorCreditor::Debtor.current_balance(dec!(100), dec!(50), dec!(30)),
            dec!(120)
        );
        assert_eq!(
            DebtorCreditor::Creditor.current_balance(dec!(100), dec!(50), dec!(30)),
            dec!(80)
        );
    }

    #[test]
    fn test_requires_sectorization() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let plain = Account::new(
            StandardAccountId::new(1),
            number("1-01"),
            "Caja",
            AccountRole::Posting,
            DebtorCreditor::Debtor,
        );
        assert!(!plain.requires_sectorization(date));

        let expired = Validity::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31),
        )
        .unwrap();
        let with_old_rule = plain.clone().with_sector(SectorCode::parse("01").unwrap(), expired);
        assert!(!with_old_rule.requires_sectorization(date));

        let current = with_old_rule.with_sector(SectorCode::parse("02").unwrap(), Validity::always());
        assert!(current.requires_sectorization(date));
        assert_eq!(current.sectors_on(date).count(), 1);
    }

    #[test]
    fn test_account_number_serializes_as_string() {
        let json = serde_json::to_string(&number("1-01")).unwrap();
        assert_eq!(json, "\"1-01\"");
        let back: AccountNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number("1-01"));
        assert!(serde_json::from_str::<AccountNumber>("\"1x\"").is_err());
    }
}
