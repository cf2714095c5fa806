//! Posting entries, output entries and the accumulation key
//!
//! Posting entries come from the retrieval port and are never mutated.
//! Valuation returns scaled copies; rollups turn them into
//! `TrialBalanceEntry` rows and accumulate new rows under a `SummaryKey`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg};

use core_kernel::{CurrencyId, LedgerId, MoneyError, StandardAccountId, SubledgerAccountId};
use core_kernel::money::checked_divide;
use domain_ledger::{Account, AccountNumber, AccountRole, CurrencyRef, DebtorCreditor, LedgerRef, SectorCode};

/// The five balance columns of a trial balance row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAmounts {
    pub initial: Decimal,
    pub debit: Decimal,
    pub credit: Decimal,
    pub current: Decimal,
    pub average: Decimal,
}

impl BalanceAmounts {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Amounts of a period with the current balance derived from the account nature
    pub fn for_movements(
        nature: DebtorCreditor,
        initial: Decimal,
        debit: Decimal,
        credit: Decimal,
        average: Decimal,
    ) -> Self {
        Self {
            initial,
            debit,
            credit,
            current: nature.current_balance(initial, debit, credit),
            average,
        }
    }

    /// Every column multiplied by `factor`
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self {
            initial: self.initial * factor,
            debit: self.debit * factor,
            credit: self.credit * factor,
            current: self.current * factor,
            average: self.average * factor,
        }
    }

    /// Every column divided by `divisor`
    pub fn divided(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        Ok(Self {
            initial: checked_divide(self.initial, divisor)?,
            debit: checked_divide(self.debit, divisor)?,
            credit: checked_divide(self.credit, divisor)?,
            current: checked_divide(self.current, divisor)?,
            average: checked_divide(self.average, divisor)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.initial.is_zero()
            && self.debit.is_zero()
            && self.credit.is_zero()
            && self.current.is_zero()
            && self.average.is_zero()
    }

    pub fn has_movements(&self) -> bool {
        !self.debit.is_zero() || !self.credit.is_zero()
    }
}

impl Add for BalanceAmounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            initial: self.initial + other.initial,
            debit: self.debit + other.debit,
            credit: self.credit + other.credit,
            current: self.current + other.current,
            average: self.average + other.average,
        }
    }
}

impl AddAssign for BalanceAmounts {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Neg for BalanceAmounts {
    type Output = Self;

    fn neg(self) -> Self {
        self.scaled(Decimal::NEGATIVE_ONE)
    }
}

impl Sum for BalanceAmounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, amounts| acc + amounts)
    }
}

/// A subledger (auxiliary) account as carried on entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubledgerRef {
    pub id: SubledgerAccountId,
    pub number: String,
    pub name: String,
}

impl SubledgerRef {
    pub fn new(id: SubledgerAccountId, number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
            name: name.into(),
        }
    }
}

/// A posting-level balance fact for one account, sector, currency and ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingEntry {
    pub ledger: LedgerRef,
    pub currency: CurrencyRef,
    pub account: AccountNumber,
    pub standard_account_id: StandardAccountId,
    pub sector: SectorCode,
    pub subledger_account: Option<SubledgerRef>,
    pub debtor_creditor: DebtorCreditor,
    pub amounts: BalanceAmounts,
    pub last_change_date: Option<NaiveDate>,
    pub exchange_rate: Decimal,
    pub second_exchange_rate: Decimal,
}

impl PostingEntry {
    /// Copy of this entry with every amount multiplied by `rate`
    pub fn multiplied_by(&self, rate: Decimal) -> Self {
        Self {
            amounts: self.amounts.scaled(rate),
            exchange_rate: rate,
            ..self.clone()
        }
    }

    /// Copy of this entry with every amount divided by `rate`
    pub fn divided_by(&self, rate: Decimal) -> Result<Self, MoneyError> {
        Ok(Self {
            amounts: self.amounts.divided(rate)?,
            exchange_rate: checked_divide(Decimal::ONE, rate)?,
            ..self.clone()
        })
    }
}

/// Role of a row in the trial balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    /// A posting row
    Entry,
    /// An ancestor account or parent sector accumulator
    Summary,
    /// A standard account subtotal over its subledger rows
    Group,
    /// Per ledger and currency total of a subledger balance
    Total,
    TotalGroupDebtor,
    TotalGroupCreditor,
    TotalDebtor,
    TotalCreditor,
    TotalCurrency,
    TotalConsolidatedByLedger,
    TotalConsolidated,
}

impl ItemType {
    /// Rows tied to an account rather than to a total
    pub fn is_account_row(&self) -> bool {
        matches!(self, ItemType::Entry | ItemType::Summary | ItemType::Group)
    }

    pub fn is_total(&self) -> bool {
        !self.is_account_row()
    }

    /// Position of the row's block inside a ledger and currency section
    pub fn block(&self) -> u8 {
        match self {
            ItemType::Entry | ItemType::Summary | ItemType::Group => 0,
            ItemType::TotalGroupDebtor | ItemType::TotalGroupCreditor => 1,
            ItemType::TotalDebtor | ItemType::TotalCreditor => 2,
            ItemType::TotalCurrency | ItemType::Total => 3,
            ItemType::TotalConsolidatedByLedger => 4,
            ItemType::TotalConsolidated => 5,
        }
    }
}

/// What a summary accumulates into
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RollupTarget {
    Account(AccountNumber),
    Group(String),
    Total,
}

/// Composite accumulation key; two contributions combine only when every
/// field matches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    pub item_type: ItemType,
    pub target: RollupTarget,
    pub sector: SectorCode,
    pub subledger: Option<SubledgerAccountId>,
    pub currency: Option<CurrencyId>,
    pub ledger: Option<LedgerId>,
    pub debtor_creditor: Option<DebtorCreditor>,
}

/// One row of a built trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceEntry {
    pub item_type: ItemType,
    /// `None` on rows merged across ledgers
    pub ledger: Option<LedgerRef>,
    /// `None` on rows consolidated across currencies
    pub currency: Option<CurrencyRef>,
    pub account: Option<AccountNumber>,
    pub standard_account_id: Option<StandardAccountId>,
    pub account_level: u32,
    pub account_role: Option<AccountRole>,
    pub sector: SectorCode,
    pub subledger_account: Option<SubledgerRef>,
    pub debtor_creditor: Option<DebtorCreditor>,
    pub group_number: Option<String>,
    pub amounts: BalanceAmounts,
    pub last_change_date: Option<NaiveDate>,
    pub exchange_rate: Decimal,
    pub second_exchange_rate: Decimal,
    /// Amounts of the comparison period on comparative balances
    pub comparison: Option<BalanceAmounts>,
}

impl TrialBalanceEntry {
    /// Posting row built from a retrieved entry and its chart account
    pub fn from_posting(posting: &PostingEntry, account: Option<&Account>) -> Self {
        Self {
            item_type: ItemType::Entry,
            ledger: Some(posting.ledger.clone()),
            currency: Some(posting.currency.clone()),
            account: Some(posting.account.clone()),
            standard_account_id: Some(posting.standard_account_id),
            account_level: posting.account.level(),
            account_role: Some(account.map_or(AccountRole::Posting, |a| a.role)),
            sector: posting.sector.clone(),
            subledger_account: posting.subledger_account.clone(),
            debtor_creditor: Some(posting.debtor_creditor),
            group_number: Some(posting.account.group_number()),
            amounts: posting.amounts,
            last_change_date: posting.last_change_date,
            exchange_rate: posting.exchange_rate,
            second_exchange_rate: posting.second_exchange_rate,
            comparison: None,
        }
    }

    /// Contribution of this row to a summary of `account` under `sector`
    pub fn summary_for(&self, account: &Account, sector: SectorCode) -> Self {
        Self {
            item_type: ItemType::Summary,
            account: Some(account.number.clone()),
            standard_account_id: Some(account.id),
            account_level: account.level(),
            account_role: Some(account.role),
            sector,
            subledger_account: None,
            debtor_creditor: Some(account.debtor_creditor),
            group_number: Some(account.group_number()),
            ..self.clone()
        }
    }

    /// Contribution of this row to a total that is not tied to an account
    pub fn total_contribution(&self, item_type: ItemType) -> Self {
        Self {
            item_type,
            account: None,
            standard_account_id: None,
            account_level: 0,
            account_role: None,
            sector: SectorCode::root(),
            subledger_account: None,
            ..self.clone()
        }
    }

    /// Identity of an account row: what must match for two rows to be the
    /// same line of the report
    pub fn identity_key(&self) -> SummaryKey {
        SummaryKey {
            item_type: self.item_type,
            target: self
                .account
                .clone()
                .map_or(RollupTarget::Total, RollupTarget::Account),
            sector: self.sector.clone(),
            subledger: self.subledger_account.as_ref().map(|s| s.id),
            currency: self.currency_id(),
            ledger: self.ledger_id(),
            debtor_creditor: None,
        }
    }

    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.ledger.as_ref().map(|l| l.id)
    }

    pub fn currency_id(&self) -> Option<CurrencyId> {
        self.currency.as_ref().map(|c| c.id)
    }

    pub fn is_debtor(&self) -> bool {
        self.debtor_creditor == Some(DebtorCreditor::Debtor)
    }

    pub fn is_creditor(&self) -> bool {
        self.debtor_creditor == Some(DebtorCreditor::Creditor)
    }

    /// Adds another contribution into this accumulator
    ///
    /// A rate survives only while every contribution carries it; rows mixing
    /// rates show 1.
    pub fn absorb(&mut self, other: &TrialBalanceEntry) {
        self.amounts += other.amounts;
        self.comparison = match (self.comparison, other.comparison) {
            (Some(left), Some(right)) => Some(left + right),
            (left, right) => left.or(right),
        };
        self.last_change_date = self.last_change_date.max(other.last_change_date);
        self.exchange_rate = common_rate(self.exchange_rate, other.exchange_rate);
        self.second_exchange_rate = common_rate(self.second_exchange_rate, other.second_exchange_rate);
    }

    /// Copy with every amount negated, including the comparison columns
    pub fn negated(&self) -> Self {
        Self {
            amounts: -self.amounts,
            comparison: self.comparison.map(|c| -c),
            ..self.clone()
        }
    }
}

fn common_rate(left: Decimal, right: Decimal) -> Decimal {
    if left == right {
        left
    } else {
        Decimal::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{CurrencyId, LedgerId};
    use rust_decimal_macros::dec;

    fn posting() -> PostingEntry {
        PostingEntry {
            ledger: LedgerRef { id: LedgerId::new(1), number: "01".into() },
            currency: CurrencyRef::new(CurrencyId::new(2), "02"),
            account: AccountNumber::parse("1-01-02").unwrap(),
            standard_account_id: StandardAccountId::new(3),
            sector: SectorCode::root(),
            subledger_account: None,
            debtor_creditor: DebtorCreditor::Debtor,
            amounts: BalanceAmounts::for_movements(
                DebtorCreditor::Debtor,
                dec!(10),
                dec!(5),
                dec!(2),
                dec!(11),
            ),
            last_change_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            exchange_rate: Decimal::ONE,
            second_exchange_rate: Decimal::ONE,
        }
    }

    #[test]
    fn test_for_movements_uses_nature() {
        let amounts = posting().amounts;
        assert_eq!(amounts.current, dec!(13));
    }

    #[test]
    fn test_multiplied_by_leaves_original_untouched() {
        let original = posting();
        let valued = original.multiplied_by(dec!(17.5));
        assert_eq!(valued.amounts.current, dec!(227.5));
        assert_eq!(valued.exchange_rate, dec!(17.5));
        assert_eq!(original.amounts.current, dec!(13));
    }

    #[test]
    fn test_divided_by_zero_fails() {
        assert!(posting().divided_by(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_absorb_adds_and_keeps_latest_change() {
        let first = TrialBalanceEntry::from_posting(&posting(), None);
        let mut second = first.clone();
        second.last_change_date = NaiveDate::from_ymd_opt(2024, 1, 20);
        second.comparison = Some(BalanceAmounts { current: dec!(4), ..Default::default() });

        let mut accumulator = first.clone();
        accumulator.absorb(&second);
        assert_eq!(accumulator.amounts.current, dec!(26));
        assert_eq!(accumulator.amounts.debit, dec!(10));
        assert_eq!(accumulator.last_change_date, NaiveDate::from_ymd_opt(2024, 1, 20));
        assert_eq!(accumulator.comparison.map(|c| c.current), Some(dec!(4)));
    }

    #[test]
    fn test_absorb_rate_ignores_contribution_order() {
        let peso = TrialBalanceEntry::from_posting(&posting(), None);
        let dollar = TrialBalanceEntry::from_posting(&posting().multiplied_by(dec!(17)), None);

        let mut same = dollar.clone();
        same.absorb(&dollar);
        assert_eq!(same.exchange_rate, dec!(17));

        let mut peso_first = peso.clone();
        peso_first.absorb(&dollar);
        peso_first.absorb(&dollar);
        let mut dollar_first = dollar.clone();
        dollar_first.absorb(&dollar);
        dollar_first.absorb(&peso);
        assert_eq!(peso_first, dollar_first);
        assert_eq!(peso_first.exchange_rate, Decimal::ONE);
    }

    #[test]
    fn test_item_type_blocks() {
        assert!(ItemType::Summary.is_account_row());
        assert!(ItemType::TotalCurrency.is_total());
        assert!(ItemType::TotalGroupDebtor.block() < ItemType::TotalDebtor.block());
        assert!(ItemType::TotalDebtor.block() < ItemType::TotalConsolidated.block());
    }

    #[test]
    fn test_identity_key_separates_ledgers() {
        let row = TrialBalanceEntry::from_posting(&posting(), None);
        let mut merged = row.clone();
        merged.ledger = None;
        assert_ne!(row.identity_key(), merged.identity_key());
    }
}
