//! Currencies and exchange rates with precise decimal arithmetic
//!
//! All amounts in the books are `rust_decimal::Decimal`; exchange rates are
//! expressed as units of the `from` currency per one unit of the `to`
//! currency, so converting a foreign balance into the `from` currency is a
//! plain multiplication.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::identifiers::CurrencyId;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid exchange rate {value} for {from} -> {to}: rates must be positive")]
    InvalidExchangeRate {
        from: String,
        to: String,
        value: Decimal,
    },

    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// A currency of the accounts chart
///
/// Currencies are master data: the `code` is the institution's own short code
/// (the domestic currency is usually `"01"`), the `abbreviation` the ISO 4217
/// symbol used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: String,
    pub abbreviation: String,
    pub name: String,
}

impl Currency {
    /// Creates a currency, rejecting empty or non-numeric codes
    pub fn new(
        id: CurrencyId,
        code: impl Into<String>,
        abbreviation: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, MoneyError> {
        let code = code.into();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(MoneyError::InvalidCurrencyCode(code));
        }
        Ok(Self {
            id,
            code,
            abbreviation: abbreviation.into(),
            name: name.into(),
        })
    }

    /// Returns true if this is the currency identified by `domestic_code`
    pub fn is_domestic(&self, domestic_code: &str) -> bool {
        self.code == domestic_code
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.abbreviation)
    }
}

/// Kind of published exchange rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeRateType {
    /// Rate published for each business day
    Daily,
    /// Official closing rate used to value month-end balances
    EndOfMonthValuation,
}

impl fmt::Display for ExchangeRateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeRateType::Daily => write!(f, "daily"),
            ExchangeRateType::EndOfMonthValuation => write!(f, "end-of-month valuation"),
        }
    }
}

/// A published exchange rate between two currencies on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub rate_type: ExchangeRateType,
    pub date: NaiveDate,
    pub from_currency: CurrencyId,
    pub to_currency: CurrencyId,
    value: Decimal,
}

impl ExchangeRate {
    /// Creates a rate; the value must be strictly positive
    pub fn new(
        rate_type: ExchangeRateType,
        date: NaiveDate,
        from_currency: CurrencyId,
        to_currency: CurrencyId,
        value: Decimal,
    ) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::InvalidExchangeRate {
                from: from_currency.to_string(),
                to: to_currency.to_string(),
                value,
            });
        }
        Ok(Self {
            rate_type,
            date,
            from_currency,
            to_currency,
            value,
        })
    }

    /// Returns the rate value
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if this rate converts `to` into `from`
    pub fn converts(&self, from: CurrencyId, to: CurrencyId) -> bool {
        self.from_currency == from && self.to_currency == to
    }
}

/// Returns true if two amounts differ by no more than `tolerance`
pub fn within_tolerance(left: Decimal, right: Decimal, tolerance: Decimal) -> bool {
    (left - right).abs() <= tolerance
}

/// Divides two amounts, failing on a zero divisor
pub fn checked_divide(amount: Decimal, divisor: Decimal) -> Result<Decimal, MoneyError> {
    if divisor.is_zero() {
        return Err(MoneyError::DivisionByZero);
    }
    amount.checked_div(divisor).ok_or(MoneyError::DivisionByZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    #[test]
    fn test_currency_creation() {
        let mxn = Currency::new(CurrencyId::new(1), "01", "MXN", "Peso mexicano").unwrap();
        assert!(mxn.is_domestic("01"));
        assert!(!mxn.is_domestic("02"));
        assert_eq!(mxn.to_string(), "Peso mexicano (MXN)");
    }

    #[test]
    fn test_currency_rejects_alphabetic_code() {
        let result = Currency::new(CurrencyId::new(2), "US", "USD", "Dollar");
        assert!(matches!(result, Err(MoneyError::InvalidCurrencyCode(_))));
    }

    #[test]
    fn test_exchange_rate_must_be_positive() {
        let result = ExchangeRate::new(
            ExchangeRateType::Daily,
            date(),
            CurrencyId::new(1),
            CurrencyId::new(2),
            dec!(0),
        );
        assert!(matches!(result, Err(MoneyError::InvalidExchangeRate { .. })));
    }

    #[test]
    fn test_exchange_rate_direction() {
        let rate = ExchangeRate::new(
            ExchangeRateType::EndOfMonthValuation,
            date(),
            CurrencyId::new(1),
            CurrencyId::new(2),
            dec!(16.5),
        )
        .unwrap();

        assert!(rate.converts(CurrencyId::new(1), CurrencyId::new(2)));
        assert!(!rate.converts(CurrencyId::new(2), CurrencyId::new(1)));
        assert_eq!(rate.value(), dec!(16.5));
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(dec!(100), dec!(109.99), dec!(10)));
        assert!(within_tolerance(dec!(100), dec!(90), dec!(10)));
        assert!(!within_tolerance(dec!(100), dec!(110.01), dec!(10)));
    }

    #[test]
    fn test_checked_divide_by_zero() {
        assert_eq!(checked_divide(dec!(10), dec!(0)), Err(MoneyError::DivisionByZero));
        assert_eq!(checked_divide(dec!(10), dec!(4)), Ok(dec!(2.5)));
    }
}
