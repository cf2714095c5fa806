//! Pre-built Test Fixtures
//!
//! A small but complete set of books: a chart with assets, liabilities and
//! capital, two ledgers, three currencies, a two-level sector tree and the
//! exchange rates published around January 2024. Every fixture is
//! deterministic so tests can assert exact amounts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    AccountsChartId, Currency, CurrencyId, ExchangeRate, ExchangeRateType, LedgerId, Period,
    StandardAccountId, SubledgerAccountId,
};
use domain_ledger::{
    Account, AccountNumber, AccountRole, AccountsChart, DebtorCreditor, Ledger, SectorCatalog,
    SectorCode, Validity,
};
use domain_trial_balance::{SubledgerRef, TrialBalanceQuery, TrialBalanceType};

/// Fixture for currency master data
pub struct CurrencyFixtures;

impl CurrencyFixtures {
    pub const PESO: CurrencyId = CurrencyId::new(1);
    pub const DOLLAR: CurrencyId = CurrencyId::new(2);
    pub const EURO: CurrencyId = CurrencyId::new(3);

    /// The domestic currency, code "01"
    pub fn peso() -> Currency {
        Currency::new(Self::PESO, "01", "MXN", "Peso mexicano").unwrap()
    }

    pub fn dollar() -> Currency {
        Currency::new(Self::DOLLAR, "02", "USD", "Dólar americano").unwrap()
    }

    pub fn euro() -> Currency {
        Currency::new(Self::EURO, "43", "EUR", "Euro").unwrap()
    }

    pub fn all() -> Vec<Currency> {
        vec![Self::peso(), Self::dollar(), Self::euro()]
    }
}

/// Fixture for ledgers
pub struct LedgerFixtures;

impl LedgerFixtures {
    pub const MAIN: LedgerId = LedgerId::new(1);
    pub const BRANCH: LedgerId = LedgerId::new(2);

    pub fn main() -> Ledger {
        Ledger::new(Self::MAIN, "01", "Oficina matriz")
    }

    pub fn branch() -> Ledger {
        Ledger::new(Self::BRANCH, "02", "Sucursal norte")
    }

    pub fn all() -> Vec<Ledger> {
        vec![Self::main(), Self::branch()]
    }
}

/// Fixture for dates and periods
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// January 2024; its last day is a Wednesday
    pub fn january() -> Period {
        Period::new(Self::date(2024, 1, 1), Self::date(2024, 1, 31)).unwrap()
    }

    pub fn december() -> Period {
        Period::new(Self::date(2023, 12, 1), Self::date(2023, 12, 31)).unwrap()
    }

    /// A date inside January used for ordinary movements
    pub fn mid_january() -> NaiveDate {
        Self::date(2024, 1, 15)
    }

    /// A date before January, feeding initial balances
    pub fn before_january() -> NaiveDate {
        Self::date(2023, 12, 15)
    }
}

/// Fixture for the sample chart of accounts
///
/// ```text
/// 1        Activo                    summary    debtor
/// 1-01     Caja y bancos             summary    debtor
/// 1-01-01  Caja                      posting    debtor   MXN USD
/// 1-01-02  Bancos                    posting    debtor   MXN USD EUR
/// 1-02     Cartera                   summary    debtor
/// 1-02-01  Cartera comercial         sectorized debtor   MXN
/// 1-02-02  Deudores diversos         control    debtor   MXN
/// 2        Pasivo                    summary    creditor
/// 2-01     Acreedores                summary    creditor
/// 2-01-01  Proveedores               posting    creditor MXN USD
/// 3        Capital                   summary    creditor
/// 3-01     Capital social            posting    creditor MXN
/// ```
pub struct ChartFixtures;

impl ChartFixtures {
    pub const CHART: AccountsChartId = AccountsChartId::new(1);

    pub fn number(value: &str) -> AccountNumber {
        AccountNumber::parse(value).unwrap()
    }

    pub fn sample() -> AccountsChart {
        let always = Validity::always();
        let peso = CurrencyFixtures::PESO;
        let dollar = CurrencyFixtures::DOLLAR;
        let euro = CurrencyFixtures::EURO;
        let rows: [(&str, &str, AccountRole, DebtorCreditor, &[CurrencyId]); 12] = [
            ("1", "Activo", AccountRole::Summary, DebtorCreditor::Debtor, &[]),
            ("1-01", "Caja y bancos", AccountRole::Summary, DebtorCreditor::Debtor, &[]),
            ("1-01-01", "Caja", AccountRole::Posting, DebtorCreditor::Debtor, &[peso, dollar]),
            ("1-01-02", "Bancos", AccountRole::Posting, DebtorCreditor::Debtor, &[peso, dollar, euro]),
            ("1-02", "Cartera", AccountRole::Summary, DebtorCreditor::Debtor, &[]),
            ("1-02-01", "Cartera comercial", AccountRole::Sectorized, DebtorCreditor::Debtor, &[peso]),
            ("1-02-02", "Deudores diversos", AccountRole::Control, DebtorCreditor::Debtor, &[peso]),
            ("2", "Pasivo", AccountRole::Summary, DebtorCreditor::Creditor, &[]),
            ("2-01", "Acreedores", AccountRole::Summary, DebtorCreditor::Creditor, &[]),
            ("2-01-01", "Proveedores", AccountRole::Posting, DebtorCreditor::Creditor, &[peso, dollar]),
            ("3", "Capital", AccountRole::Summary, DebtorCreditor::Creditor, &[]),
            ("3-01", "Capital social", AccountRole::Posting, DebtorCreditor::Creditor, &[peso]),
        ];

        let mut chart = AccountsChart::new(Self::CHART, "Catálogo de prueba");
        for (idx, (number, name, role, nature, currencies)) in rows.into_iter().enumerate() {
            let account = currencies.iter().fold(
                Account::new(
                    StandardAccountId::new(idx as i64 + 1),
                    Self::number(number),
                    name,
                    role,
                    nature,
                ),
                |account, currency| account.with_currency(*currency, always),
            );
            chart.add_account(account).unwrap();
        }
        chart
    }
}

/// Fixture for the sector tree
///
/// ```text
/// 00 Sin sector
/// ├── 01 Público
/// │   ├── 0101 Federal
/// │   └── 0102 Estatal
/// └── 02 Privado
/// ```
pub struct SectorFixtures;

impl SectorFixtures {
    pub fn code(value: &str) -> SectorCode {
        SectorCode::parse(value).unwrap()
    }

    pub fn sample() -> SectorCatalog {
        let mut catalog = SectorCatalog::new();
        catalog.add_sector(Self::code("01"), "Público", SectorCode::root()).unwrap();
        catalog.add_sector(Self::code("0101"), "Federal", Self::code("01")).unwrap();
        catalog.add_sector(Self::code("0102"), "Estatal", Self::code("01")).unwrap();
        catalog.add_sector(Self::code("02"), "Privado", SectorCode::root()).unwrap();
        catalog
    }
}

/// Fixture for subledger accounts
pub struct SubledgerFixtures;

impl SubledgerFixtures {
    pub fn client_a() -> SubledgerRef {
        SubledgerRef::new(SubledgerAccountId::new(1), "900001", "Comercial del Bajío")
    }

    pub fn client_b() -> SubledgerRef {
        SubledgerRef::new(SubledgerAccountId::new(2), "900002", "Distribuidora del Golfo")
    }
}

/// Fixture for published exchange rates, in pesos per foreign unit
pub struct RateFixtures;

impl RateFixtures {
    pub const DOLLAR_CLOSING: Decimal = dec!(17.0);
    pub const EURO_CLOSING: Decimal = dec!(18.5);
    pub const DOLLAR_DECEMBER: Decimal = dec!(16.9);

    fn rate(rate_type: ExchangeRateType, date: NaiveDate, to: CurrencyId, value: Decimal) -> ExchangeRate {
        ExchangeRate::new(rate_type, date, CurrencyFixtures::PESO, to, value).unwrap()
    }

    /// Month-end rates of January and December plus a daily rate mid January
    pub fn sample() -> Vec<ExchangeRate> {
        let january = TemporalFixtures::date(2024, 1, 31);
        let december = TemporalFixtures::date(2023, 12, 31);
        vec![
            Self::rate(ExchangeRateType::EndOfMonthValuation, january, CurrencyFixtures::DOLLAR, Self::DOLLAR_CLOSING),
            Self::rate(ExchangeRateType::EndOfMonthValuation, january, CurrencyFixtures::EURO, Self::EURO_CLOSING),
            Self::rate(ExchangeRateType::EndOfMonthValuation, december, CurrencyFixtures::DOLLAR, Self::DOLLAR_DECEMBER),
            Self::rate(ExchangeRateType::EndOfMonthValuation, december, CurrencyFixtures::EURO, dec!(18.2)),
            Self::rate(ExchangeRateType::Daily, TemporalFixtures::mid_january(), CurrencyFixtures::DOLLAR, dec!(17.1)),
        ]
    }
}

/// Fixture for queries over the sample chart
pub struct QueryFixtures;

impl QueryFixtures {
    pub fn january(trial_balance_type: TrialBalanceType) -> TrialBalanceQuery {
        let period = TemporalFixtures::january();
        TrialBalanceQuery::new(ChartFixtures::CHART, trial_balance_type, period.from, period.to).unwrap()
    }

    pub fn traditional() -> TrialBalanceQuery {
        Self::january(TrialBalanceType::Traditional)
    }
}
