//! Posting store over recorded movements
//!
//! Movements are dated debits and credits against one account, sector,
//! currency and ledger. A query aggregates them into one `PostingEntry` per
//! combination: movements before the period form the initial balance,
//! movements inside it the debit and credit columns. Movements after the
//! period end are ignored.

use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

use core_kernel::{Currency, CurrencyId, DomainPort, LedgerId, PortError, SubledgerAccountId};
use domain_ledger::{
    Account, AccountHierarchy, AccountNumber, AccountsChart, CurrencyRef, Ledger, SectorCode,
};

use crate::entry::{BalanceAmounts, PostingEntry, SubledgerRef};
use crate::ports::{PostingQuery, PostingRepository};
use crate::query::BalancesType;
use crate::settings::AverageBalanceBasis;

/// One dated movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMovement {
    pub ledger: LedgerId,
    pub currency: CurrencyId,
    pub account: AccountNumber,
    pub sector: SectorCode,
    pub subledger: Option<SubledgerRef>,
    pub date: NaiveDate,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl LedgerMovement {
    pub fn debit(
        ledger: LedgerId,
        currency: CurrencyId,
        account: AccountNumber,
        date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            ledger,
            currency,
            account,
            sector: SectorCode::root(),
            subledger: None,
            date,
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    pub fn credit(
        ledger: LedgerId,
        currency: CurrencyId,
        account: AccountNumber,
        date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            credit: amount,
            debit: Decimal::ZERO,
            ..Self::debit(ledger, currency, account, date, Decimal::ZERO)
        }
    }

    pub fn in_sector(mut self, sector: SectorCode) -> Self {
        self.sector = sector;
        self
    }

    pub fn for_subledger(mut self, subledger: SubledgerRef) -> Self {
        self.subledger = Some(subledger);
        self
    }
}

/// Days between `from` and `to`, both included, under `basis`
pub fn day_count(basis: AverageBalanceBasis, from: NaiveDate, to: NaiveDate) -> i64 {
    match basis {
        AverageBalanceBasis::Calendar => (to - from).num_days() + 1,
        AverageBalanceBasis::Commercial => {
            let start_day = i64::from(from.day().min(30));
            let end_day = i64::from(to.day().min(30));
            360 * i64::from(to.year() - from.year())
                + 30 * (i64::from(to.month()) - i64::from(from.month()))
                + (end_day - start_day)
                + 1
        }
    }
}

type GroupKey = (LedgerId, CurrencyId, AccountNumber, SectorCode, Option<SubledgerAccountId>);

#[derive(Debug, Default)]
struct Accumulator {
    initial: Decimal,
    debit: Decimal,
    credit: Decimal,
    weighted: Decimal,
    subledger: Option<SubledgerRef>,
    last_change: Option<NaiveDate>,
}

/// In-memory `PostingRepository`
#[derive(Debug)]
pub struct InMemoryPostingStore {
    chart: Arc<AccountsChart>,
    ledgers: HashMap<LedgerId, Ledger>,
    currencies: HashMap<CurrencyId, Currency>,
    basis: AverageBalanceBasis,
    movements: RwLock<Vec<LedgerMovement>>,
}

impl InMemoryPostingStore {
    pub fn new(chart: Arc<AccountsChart>) -> Self {
        Self {
            chart,
            ledgers: HashMap::new(),
            currencies: HashMap::new(),
            basis: AverageBalanceBasis::default(),
            movements: RwLock::new(Vec::new()),
        }
    }

    pub fn with_ledgers(mut self, ledgers: impl IntoIterator<Item = Ledger>) -> Self {
        self.ledgers.extend(ledgers.into_iter().map(|ledger| (ledger.id, ledger)));
        self
    }

    pub fn with_currencies(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.currencies
            .extend(currencies.into_iter().map(|currency| (currency.id, currency)));
        self
    }

    pub fn with_average_basis(mut self, basis: AverageBalanceBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Records a movement against a posting account
    ///
    /// # Errors
    ///
    /// Returns `PortError::Rejected` for unknown accounts, ledgers or
    /// currencies, accounts that do not accept postings, and negative amounts
    pub fn record(&self, movement: LedgerMovement) -> Result<(), PortError> {
        let account = self.chart.account(&movement.account).ok_or_else(|| {
            PortError::rejected_field(format!("unknown account {}", movement.account), "account")
        })?;
        if !account.role.accepts_postings() {
            return Err(PortError::rejected_field(
                format!("account {} does not accept postings", movement.account),
                "account",
            ));
        }
        if !self.ledgers.contains_key(&movement.ledger) {
            return Err(PortError::rejected_field(
                format!("unknown ledger {}", movement.ledger),
                "ledger",
            ));
        }
        if !self.currencies.contains_key(&movement.currency) {
            return Err(PortError::rejected_field(
                format!("unknown currency {}", movement.currency),
                "currency",
            ));
        }
        if movement.debit < Decimal::ZERO || movement.credit < Decimal::ZERO {
            return Err(PortError::rejected("movement amounts must not be negative"));
        }
        self.movements.write().push(movement);
        Ok(())
    }

    pub fn record_all(
        &self,
        movements: impl IntoIterator<Item = LedgerMovement>,
    ) -> Result<(), PortError> {
        movements.into_iter().try_for_each(|movement| self.record(movement))
    }

    pub fn len(&self) -> usize {
        self.movements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.read().is_empty()
    }

    fn matches(&self, query: &PostingQuery, movement: &LedgerMovement) -> bool {
        if movement.date > query.to_date
            || !query.includes_ledger(movement.ledger)
            || !query.includes_currency(movement.currency)
            || !query.includes_sector(&movement.sector)
            || !query.account_in_range(&movement.account)
        {
            return false;
        }
        match &query.subledger_account {
            Some(number) => movement
                .subledger
                .as_ref()
                .is_some_and(|subledger| &subledger.number == number),
            None => true,
        }
    }

    fn entry_for(
        &self,
        query: &PostingQuery,
        key: GroupKey,
        acc: Accumulator,
    ) -> Result<PostingEntry, PortError> {
        let (ledger_id, currency_id, number, sector, _) = key;
        let account = self.account(&number)?;
        let nature = account.debtor_creditor;
        let days = Decimal::from(day_count(self.basis, query.from_date, query.to_date).max(1));
        let average = (acc.initial * days + acc.weighted) / days;
        Ok(PostingEntry {
            ledger: self.ledger(ledger_id)?.reference(),
            currency: self.currency(currency_id)?,
            account: number,
            standard_account_id: account.id,
            sector,
            subledger_account: acc.subledger,
            debtor_creditor: nature,
            amounts: BalanceAmounts::for_movements(nature, acc.initial, acc.debit, acc.credit, average),
            last_change_date: acc.last_change,
            exchange_rate: Decimal::ONE,
            second_exchange_rate: Decimal::ONE,
        })
    }

    fn account(&self, number: &AccountNumber) -> Result<&Account, PortError> {
        self.chart
            .account(number)
            .ok_or_else(|| PortError::not_found("Account", number))
    }

    fn ledger(&self, id: LedgerId) -> Result<&Ledger, PortError> {
        self.ledgers.get(&id).ok_or_else(|| PortError::not_found("Ledger", id))
    }

    fn currency(&self, id: CurrencyId) -> Result<CurrencyRef, PortError> {
        self.currencies
            .get(&id)
            .map(CurrencyRef::from)
            .ok_or_else(|| PortError::not_found("Currency", id))
    }

    /// Zero rows for posting accounts without movements, one per registered
    /// ledger and per currency the account carries on the end date
    fn catalog_rows(
        &self,
        query: &PostingQuery,
        grouped: &BTreeMap<GroupKey, Accumulator>,
    ) -> Result<Vec<PostingEntry>, PortError> {
        let mut rows = Vec::new();
        let mut ledgers: Vec<&Ledger> = self
            .ledgers
            .values()
            .filter(|ledger| query.includes_ledger(ledger.id))
            .collect();
        ledgers.sort_by(|a, b| a.number.cmp(&b.number));

        for account in self.chart.posting_accounts(query.to_date) {
            if !query.account_in_range(&account.number) {
                continue;
            }
            for ledger in &ledgers {
                for currency in account.currencies_on(query.to_date) {
                    if !query.includes_currency(currency) {
                        continue;
                    }
                    let key = (ledger.id, currency, account.number.clone(), SectorCode::root(), None);
                    if grouped.contains_key(&key) {
                        continue;
                    }
                    rows.push(self.entry_for(query, key, Accumulator::default())?);
                }
            }
        }
        Ok(rows)
    }
}

fn keep(balances_type: BalancesType, amounts: &BalanceAmounts) -> bool {
    match balances_type {
        BalancesType::AllAccounts | BalancesType::AllAccountsInCatalog => true,
        BalancesType::WithCurrentBalance => !amounts.current.is_zero(),
        BalancesType::WithCurrentBalanceOrMovements => {
            !amounts.current.is_zero() || amounts.has_movements()
        }
        BalancesType::WithMovements => amounts.has_movements(),
    }
}

impl DomainPort for InMemoryPostingStore {}

impl PostingRepository for InMemoryPostingStore {
    #[instrument(skip(self, query), fields(from = %query.from_date, to = %query.to_date))]
    fn get_postings(&self, query: &PostingQuery) -> Result<Vec<PostingEntry>, PortError> {
        if query.accounts_chart_id != self.chart.id {
            return Err(PortError::not_found("AccountsChart", query.accounts_chart_id));
        }

        let mut grouped: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
        {
            let movements = self.movements.read();
            for movement in movements.iter().filter(|m| self.matches(query, m)) {
                let nature = self.account(&movement.account)?.debtor_creditor;
                let signed = nature.current_balance(Decimal::ZERO, movement.debit, movement.credit);
                let subledger = movement
                    .subledger
                    .as_ref()
                    .filter(|_| query.with_subledger_accounts);
                let key = (
                    movement.ledger,
                    movement.currency,
                    movement.account.clone(),
                    movement.sector.clone(),
                    subledger.map(|s| s.id),
                );

                let acc = grouped.entry(key).or_default();
                if acc.subledger.is_none() {
                    acc.subledger = subledger.cloned();
                }
                if movement.date < query.from_date {
                    acc.initial += signed;
                } else {
                    acc.debit += movement.debit;
                    acc.credit += movement.credit;
                    let remaining = day_count(self.basis, movement.date, query.to_date);
                    acc.weighted += signed * Decimal::from(remaining);
                }
                acc.last_change = acc.last_change.max(Some(movement.date));
            }
        }

        let extra = if query.balances_type == BalancesType::AllAccountsInCatalog {
            self.catalog_rows(query, &grouped)?
        } else {
            Vec::new()
        };

        let mut entries = Vec::with_capacity(grouped.len() + extra.len());
        for (key, acc) in grouped {
            entries.push(self.entry_for(query, key, acc)?);
        }
        entries.extend(extra);
        entries.retain(|entry| keep(query.balances_type, &entry.amounts));

        debug!(count = entries.len(), "postings aggregated");
        Ok(entries)
    }
}
