//! Test Data Builders
//!
//! `MovementBuilder` creates single movements with sensible defaults;
//! `BooksBuilder` wires the sample master data, an in-memory posting store
//! and rate source into a ready `TrialBalanceBuilder`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use core_kernel::{Currency, CurrencyId, ExchangeRate, LedgerId, WorkingCalendar};
use domain_ledger::{AccountNumber, AccountsChart, Ledger, SectorCatalog, SectorCode};
use domain_trial_balance::adapters::{InMemoryExchangeRates, InMemoryPostingStore, LedgerMovement};
use domain_trial_balance::{
    EngineSettings, SubledgerRef, TrialBalanceBuilder, TrialBalanceCache,
};

use crate::fixtures::{
    ChartFixtures, CurrencyFixtures, LedgerFixtures, RateFixtures, SectorFixtures,
    TemporalFixtures,
};

/// Builder for a single ledger movement
pub struct MovementBuilder {
    ledger: LedgerId,
    currency: CurrencyId,
    account: AccountNumber,
    sector: SectorCode,
    subledger: Option<SubledgerRef>,
    date: NaiveDate,
    debit: Decimal,
    credit: Decimal,
}

impl Default for MovementBuilder {
    fn default() -> Self {
        Self::new("1-01-01")
    }
}

impl MovementBuilder {
    /// A zero movement against `account` in the main ledger, in pesos, mid January
    pub fn new(account: &str) -> Self {
        Self {
            ledger: LedgerFixtures::MAIN,
            currency: CurrencyFixtures::PESO,
            account: ChartFixtures::number(account),
            sector: SectorCode::root(),
            subledger: None,
            date: TemporalFixtures::mid_january(),
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
        }
    }

    pub fn debit(mut self, amount: Decimal) -> Self {
        self.debit = amount;
        self
    }

    pub fn credit(mut self, amount: Decimal) -> Self {
        self.credit = amount;
        self
    }

    pub fn in_ledger(mut self, ledger: LedgerId) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn in_currency(mut self, currency: CurrencyId) -> Self {
        self.currency = currency;
        self
    }

    pub fn in_sector(mut self, sector: &str) -> Self {
        self.sector = SectorFixtures::code(sector);
        self
    }

    pub fn for_subledger(mut self, subledger: SubledgerRef) -> Self {
        self.subledger = Some(subledger);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn build(self) -> LedgerMovement {
        LedgerMovement {
            ledger: self.ledger,
            currency: self.currency,
            account: self.account,
            sector: self.sector,
            subledger: self.subledger,
            date: self.date,
            debit: self.debit,
            credit: self.credit,
        }
    }
}

/// The injected collaborators of one test
pub struct TestBooks {
    pub chart: Arc<AccountsChart>,
    pub sectors: Arc<SectorCatalog>,
    pub store: Arc<InMemoryPostingStore>,
    pub rates: Arc<InMemoryExchangeRates>,
    pub currencies: Vec<Currency>,
    pub calendar: WorkingCalendar,
    pub settings: EngineSettings,
}

impl TestBooks {
    /// A balance builder over these books, without a cache
    pub fn builder(&self) -> TrialBalanceBuilder {
        TrialBalanceBuilder::new(
            self.store.clone(),
            self.rates.clone(),
            self.chart.clone(),
            self.sectors.clone(),
            self.settings.clone(),
        )
        .with_currencies(self.currencies.clone())
        .with_calendar(self.calendar.clone())
    }

    pub fn cached_builder(&self, cache: Arc<TrialBalanceCache>) -> TrialBalanceBuilder {
        self.builder().with_cache(cache)
    }

    /// Records one more movement after the books were built
    pub fn record(&self, movement: LedgerMovement) {
        self.store.record(movement).unwrap();
    }
}

/// Builder for a complete set of test books
pub struct BooksBuilder {
    chart: AccountsChart,
    sectors: SectorCatalog,
    ledgers: Vec<Ledger>,
    currencies: Vec<Currency>,
    rates: Vec<ExchangeRate>,
    movements: Vec<LedgerMovement>,
    calendar: WorkingCalendar,
    settings: EngineSettings,
}

impl Default for BooksBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BooksBuilder {
    /// The sample chart, sectors, ledgers, currencies and rates, no movements
    pub fn new() -> Self {
        Self {
            chart: ChartFixtures::sample(),
            sectors: SectorFixtures::sample(),
            ledgers: LedgerFixtures::all(),
            currencies: CurrencyFixtures::all(),
            rates: RateFixtures::sample(),
            movements: Vec::new(),
            calendar: WorkingCalendar::new(),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_chart(mut self, chart: AccountsChart) -> Self {
        self.chart = chart;
        self
    }

    pub fn with_movement(mut self, movement: LedgerMovement) -> Self {
        self.movements.push(movement);
        self
    }

    pub fn with_movements(mut self, movements: impl IntoIterator<Item = LedgerMovement>) -> Self {
        self.movements.extend(movements);
        self
    }

    /// Replaces the published rates
    pub fn with_rates(mut self, rates: Vec<ExchangeRate>) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_calendar(mut self, calendar: WorkingCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> TestBooks {
        let chart = Arc::new(self.chart);
        let store = InMemoryPostingStore::new(chart.clone())
            .with_ledgers(self.ledgers)
            .with_currencies(self.currencies.clone())
            .with_average_basis(self.settings.average_balance_days_basis);
        store.record_all(self.movements).unwrap();

        TestBooks {
            chart,
            sectors: Arc::new(self.sectors),
            store: Arc::new(store),
            rates: Arc::new(InMemoryExchangeRates::with_rates(self.rates)),
            currencies: self.currencies,
            calendar: self.calendar,
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_movement_defaults() {
        let movement = MovementBuilder::new("2-01-01").credit(dec!(40)).build();
        assert_eq!(movement.ledger, LedgerFixtures::MAIN);
        assert_eq!(movement.credit, dec!(40));
        assert!(movement.sector.is_root());
    }

    #[test]
    fn test_books_record_movements() {
        let books = BooksBuilder::new()
            .with_movement(MovementBuilder::new("1-01-01").debit(dec!(10)).build())
            .build();
        assert_eq!(books.store.len(), 1);
    }
}
